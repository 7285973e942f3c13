//! `goo` command line.
//!
//! Serves a project, lists its routes, or prints the composed template
//! source of one page.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use goo_compiler::{init_logging, server, CompilerService, GooConfig, GooError};

#[derive(Parser)]
#[command(name = "goo")]
#[command(author, version, about = "Single-file component compiler and page server", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root
    #[arg(short, long, global = true, default_value = ".")]
    root: PathBuf,

    /// Config file (defaults to <root>/goo.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log filter, overridden by RUST_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve every discovered page
    Serve {
        /// Address to bind to
        #[arg(short, long)]
        address: Option<String>,

        /// Recompile every page on every request
        #[arg(long)]
        no_cache: bool,

        /// Recompile cached pages whose sources changed
        #[arg(long)]
        invalidate_on_change: bool,

        /// Compile every page before accepting requests
        #[arg(long)]
        warm: bool,
    },

    /// List discovered routes
    Routes,

    /// Print the composed template source of a page
    Build {
        /// Page source, relative to the project root
        page: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error[{}]: {}", e.code(), e);
            return ExitCode::FAILURE;
        }
    };
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    init_logging(&config.log_level);

    let result = match cli.command {
        Commands::Serve {
            address,
            no_cache,
            invalidate_on_change,
            warm,
        } => {
            if let Some(address) = address {
                config.server.address = address;
            }
            if no_cache {
                config.cache = false;
            }
            if invalidate_on_change {
                config.invalidate_on_change = true;
            }
            run_server(config, warm).await
        }
        Commands::Routes => CompilerService::new(config).map(|service| {
            for route in service.routes() {
                println!("{:<32} {}", route.path, route.source.display());
            }
        }),
        Commands::Build { page } => {
            let page = if page.is_absolute() {
                page
            } else {
                config.root.join(page)
            };
            CompilerService::new(config)
                .and_then(|service| service.compile_page(&page))
                .map(|compiled| println!("{}", compiled.source()))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(code = e.code(), "{}", e);
            eprintln!("error[{}]: {}", e.code(), e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<GooConfig, GooError> {
    match &cli.config {
        Some(path) => GooConfig::load(path),
        None => GooConfig::discover(&cli.root),
    }
}

async fn run_server(config: GooConfig, warm: bool) -> Result<(), GooError> {
    let address = config.server.address.clone();
    let service = Arc::new(CompilerService::new(config)?);

    if warm {
        let warming = Arc::clone(&service);
        let report = tokio::task::spawn_blocking(move || warming.warm())
            .await
            .map_err(std::io::Error::from)?;
        if !report.failures.is_empty() {
            tracing::warn!(failed = report.failures.len(), "some pages failed to compile");
        }
    }

    server::serve(service, &address).await?;
    Ok(())
}
