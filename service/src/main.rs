mod analyze;
mod arrow_io;
mod config;
mod error;
mod models;
mod routes;
mod storage;

use axum::{Router, extract::DefaultBodyLimit};
use clap::{Parser, Subcommand};
use config::ServiceConfig;
use error::ServiceError;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{CorsLayer, Any};
use tower_http::services::ServeDir;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "log_analyzer",
    version,
    about = "Parse service logs and export aggregate statistics"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default)
    Serve {
        #[arg(long)]
        bind: Option<String>,

        /// Directory analyses are stored in
        #[arg(long)]
        data_dir: Option<PathBuf>,

        #[arg(long)]
        workers: Option<usize>,
    },

    /// Analyze one log file, export the results and print the statistics
    Analyze {
        file: PathBuf,

        /// Directory the analysis is written to
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(long)]
        workers: Option<usize>,

        /// Keep outcomes in completion order instead of input order
        #[arg(long)]
        unordered: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr, stdout carries the stats JSON
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "log_analyzer=debug,log_parser=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = ServiceConfig::from_env();

    match cli.command {
        Some(Command::Analyze { file, output, workers, unordered }) => {
            if let Some(output) = output {
                config.data_dir = output;
            }
            if let Some(workers) = workers {
                config.workers = workers;
            }
            config.preserve_order = !unordered;

            let (_, stats) = tokio::task::spawn_blocking(move || analyze::run(&config, &file)).await??;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }

        Some(Command::Serve { bind, data_dir, workers }) => {
            if let Some(bind) = bind {
                config.bind_address = bind;
            }
            if let Some(data_dir) = data_dir {
                config.data_dir = data_dir;
            }
            if let Some(workers) = workers {
                config.workers = workers;
            }
            serve(config).await?;
        }

        None => serve(config).await?,
    }

    Ok(())
}

async fn serve(config: ServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate().map_err(ServiceError::Config)?;

    let storage = storage::AnalysisStorage::new(&config.data_dir)?;
    let state = routes::AppState {
        storage: Arc::new(storage),
        dispatch: config.dispatch_config(),
    };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Exported artifacts are also downloadable as plain files
    let app = Router::new()
        .merge(routes::create_routes(state))
        .nest_service("/files", ServeDir::new(&config.data_dir))
        .layer(DefaultBodyLimit::max(config.body_limit_bytes()))
        .layer(cors);

    tracing::info!(
        "Starting log analyzer on {} (data dir {}, {} workers)",
        config.bind_address,
        config.data_dir.display(),
        config.workers
    );

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
