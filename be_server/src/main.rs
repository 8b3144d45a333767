//! Bracket server.
//!
//! Serves bracket generation and match advancement over HTTP, backed by
//! either process memory or PostgreSQL.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use be_server::{
    api,
    config::{ServerConfig, StorageBackend},
    logging,
};
use bracket_engine::{
    BracketManager,
    db::{Database, InMemoryMatchRepository, MatchRepository},
};
use log::info;
use pico_args::Arguments;

const HELP: &str = "\
Run a tournament bracket server

USAGE:
  be_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --storage    BACKEND     memory or postgres          [default: env BRACKET_STORAGE or memory]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  BRACKET_STORAGE          Storage backend
  DATABASE_URL             PostgreSQL connection string (postgres backend)
  BRACKET_MIN_ENTRANTS     Entrants required to generate a bracket [default: 2]
  BRACKET_DRAW_SEED        Fixed seed for random draws
  RUST_LOG                 Log filter (e.g., info,bracket_engine=debug)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;
    let storage: Option<StorageBackend> = pargs.opt_value_from_str("--storage")?;

    logging::init();

    let config = ServerConfig::from_env(bind, storage)?;
    config.validate()?;
    info!(
        "Starting bracket server at {} with {} storage",
        config.bind, config.storage
    );

    let mut database = None;
    let repository: Arc<dyn MatchRepository> = match &config.database {
        Some(db_config) => {
            info!("Connecting to database");
            let db = Database::new(db_config)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
            db.migrate()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
            info!("Database connected and migrated");

            let repository: Arc<dyn MatchRepository> = Arc::new(db.repository());
            database = Some(db);
            repository
        }
        None => Arc::new(InMemoryMatchRepository::new()),
    };

    let manager = Arc::new(BracketManager::new(repository, config.engine.clone()));
    let app = api::create_router(api::AppState { manager });

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");
    if let Some(db) = database {
        db.close().await;
    }

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::error!("Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
}
