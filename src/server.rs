//! HTTP adapter.
//!
//! One GET handler per discovered route. Compilation and rendering are
//! blocking, so each request runs the pipeline on the blocking pool; a
//! failure becomes a 500 response carrying the diagnostic code, never a
//! crashed server.

use axum::extract::{Query, State};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::discovery::Route;
use crate::error::GooError;
use crate::service::CompilerService;

pub const ERROR_CODE_HEADER: &str = "x-goo-error";

/// Builds the router for every route the service discovered.
pub fn router(service: Arc<CompilerService>) -> Router {
    let mut router = Router::new();

    for route in service.routes() {
        tracing::info!(path = %route.path, source = %route.source.display(), "registered route");
        let path = route.path.clone();
        let route = route.clone();
        router = router.route(
            &path,
            get(
                move |State(service): State<Arc<CompilerService>>,
                      Query(query): Query<BTreeMap<String, String>>| {
                    render_route(service, route.clone(), query)
                },
            ),
        );
    }

    router.with_state(service)
}

pub async fn serve(service: Arc<CompilerService>, address: &str) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(address).await?;
    tracing::info!(address = %listener.local_addr()?, "serving");
    axum::serve(listener, router(service)).await
}

async fn render_route(
    service: Arc<CompilerService>,
    route: Route,
    query: BTreeMap<String, String>,
) -> Response {
    let context = json!({
        "path": route.path,
        "query": query,
    });

    let page = route.source.clone();
    let rendered =
        tokio::task::spawn_blocking(move || service.render_page(&page, &context)).await;

    match rendered {
        Ok(Ok(html)) => Html(html).into_response(),
        Ok(Err(e)) => error_response(&route, &e),
        Err(e) => {
            tracing::error!(path = %route.path, "render task failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "render task failed").into_response()
        }
    }
}

fn error_response(route: &Route, error: &GooError) -> Response {
    tracing::error!(path = %route.path, code = error.code(), "{}", error);

    let mut response = (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("[{}] {}", error.code(), error),
    )
        .into_response();
    response
        .headers_mut()
        .insert(ERROR_CODE_HEADER, HeaderValue::from_static(error.code()));
    response
}
