use clap::Parser;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use tokio::net::TcpListener;
use tracing::{error, info};

use user_crud_server::config::AppConfig;
use user_crud_server::error::{AppError, AppResult};
use user_crud_server::{logging, startup};

#[derive(Parser, Debug)]
#[command(name = "user-crud-server")]
#[command(about = "HTTP CRUD service for user records over MongoDB, PostgreSQL, MySQL or SQLite")]
struct Args {
    /// Configuration file path (default: config.yaml when present)
    #[arg(short, long)]
    config: Option<String>,

    /// Port to listen on (overrides config file and environment)
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to (overrides config file and environment)
    #[arg(long)]
    host: Option<String>,
}

fn load_config(args: &Args) -> AppResult<AppConfig> {
    let mut config = match &args.config {
        Some(path) => AppConfig::load_from_file(path)?,
        None if Path::new("config.yaml").exists() => AppConfig::load_from_file("config.yaml")?,
        None => AppConfig::default(),
    };

    config.apply_env_overrides(|key| std::env::var(key).ok())?;

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }

    Ok(config)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Values from .env never override variables already set in the environment
    dotenvy::dotenv().ok();
    logging::init_tracing("info");

    let app_config = load_config(&args)?;
    info!(
        "Server starting with {} backend",
        app_config.database.db_type
    );

    let backend = startup::connect_backend(&app_config.database)
        .await
        .inspect_err(|e| error!("Failed to initialize database: {}", e))?;

    let app = startup::build_router(backend.clone());

    let host: IpAddr = app_config.server.host.parse().map_err(|_| {
        AppError::Configuration(format!("Invalid host address: {}", app_config.server.host))
    })?;
    let addr = SocketAddr::from((host, app_config.server.port));

    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    backend.disconnect().await?;
    info!("Server stopped");

    Ok(())
}
