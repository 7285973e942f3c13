//! Discovery Module
//!
//! Startup validation of the project structure and route discovery: every
//! file named like the entry page under the app folder becomes a route,
//! with its URL derived from its directory relative to the app folder.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::GooConfig;
use crate::error::{GooError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    /// URL path, `/` for the entry page.
    pub path: String,
    pub source: PathBuf,
}

/// The required pieces of a project, located and loaded at startup.
#[derive(Debug, Clone)]
pub struct ProjectStructure {
    pub app_dir: PathBuf,
    pub layout_path: PathBuf,
    pub layout_source: String,
    pub entry_page: PathBuf,
}

/// Locates the app folder, base layout and entry page. Any of them missing
/// is a structural failure, which callers treat as fatal.
pub fn validate_structure(config: &GooConfig) -> Result<ProjectStructure> {
    let app_dir = config.app_path();
    let layout_path = config.layout_path();
    let entry_page = config.entry_path();

    if !app_dir.is_dir() {
        return Err(GooError::StructuralValidationFailure(format!(
            "app folder {:?} not found",
            app_dir
        )));
    }
    if !layout_path.is_file() {
        return Err(GooError::StructuralValidationFailure(format!(
            "base layout {:?} not found",
            layout_path
        )));
    }
    if !entry_page.is_file() {
        return Err(GooError::StructuralValidationFailure(format!(
            "entry page {:?} not found",
            entry_page
        )));
    }

    let layout_source = fs::read_to_string(&layout_path).map_err(|e| {
        GooError::StructuralValidationFailure(format!(
            "base layout {:?} is unreadable: {}",
            layout_path, e
        ))
    })?;

    Ok(ProjectStructure {
        app_dir,
        layout_path,
        layout_source,
        entry_page,
    })
}

/// Recursively finds every page file under `app_dir`, sorted by URL path.
pub fn discover_routes(app_dir: &Path, entry_file: &str) -> Vec<Route> {
    let mut routes = Vec::new();

    for entry in WalkDir::new(app_dir).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("skipping unreadable entry during route discovery: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() || entry.file_name() != entry_file {
            continue;
        }

        let source = entry.path().to_path_buf();
        routes.push(Route {
            path: route_path(app_dir, &source),
            source,
        });
    }

    routes.sort_by(|a, b| a.path.cmp(&b.path));
    routes
}

/// URL path for a page: its directory relative to the app folder, with
/// forward slashes and no trailing slash.
pub fn route_path(app_dir: &Path, page: &Path) -> String {
    let dir = page
        .parent()
        .and_then(|dir| dir.strip_prefix(app_dir).ok())
        .unwrap_or_else(|| Path::new(""));

    let segments: Vec<String> = dir
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();

    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn project(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for file in files {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, "<html><body></body></html>").unwrap();
        }
        dir
    }

    #[test]
    fn test_route_paths() {
        let app = Path::new("site/app");
        assert_eq!(route_path(app, Path::new("site/app/page.goo")), "/");
        assert_eq!(route_path(app, Path::new("site/app/blog/page.goo")), "/blog");
        assert_eq!(
            route_path(app, Path::new("site/app/docs/getting-started/page.goo")),
            "/docs/getting-started"
        );
    }

    #[test]
    fn test_discovers_only_page_files() {
        let dir = project(&[
            "index.html",
            "app/page.goo",
            "app/about/page.goo",
            "app/about/team.goo",
            "app/components/card.goo",
        ]);

        let routes = discover_routes(&dir.path().join("app"), "page.goo");
        let paths: Vec<_> = routes.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/", "/about"]);
        assert_eq!(routes[1].source, dir.path().join("app/about/page.goo"));
    }

    #[test]
    fn test_valid_structure() {
        let dir = project(&["index.html", "app/page.goo"]);
        let structure = validate_structure(&GooConfig::with_root(dir.path())).unwrap();
        assert_eq!(structure.layout_source, "<html><body></body></html>");
        assert_eq!(structure.entry_page, dir.path().join("app").join("page.goo"));
    }

    #[test]
    fn test_missing_pieces_fail_validation() {
        for files in [
            &["index.html"][..],
            &["app/page.goo"][..],
            &["index.html", "app/about/page.goo"][..],
        ] {
            let dir = project(files);
            let err = validate_structure(&GooConfig::with_root(dir.path())).unwrap_err();
            assert!(
                matches!(err, GooError::StructuralValidationFailure(_)),
                "{:?} should fail validation",
                files
            );
        }
    }
}
