use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

mod app;
mod auth;
mod envelope;
mod expand;
mod http;

#[derive(Parser)]
#[command(name = "upkeep-gateway", version, about = "Facilities maintenance HTTP service")]
struct Args {
    /// Path to upkeep.toml (defaults to ~/.upkeep/upkeep.toml).
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "upkeep_gateway=info,tower_http=debug".into()),
        )
        .init();

    // config: explicit flag > UPKEEP_CONFIG env > ~/.upkeep/upkeep.toml
    let args = Args::parse();
    let config_path = args.config.or_else(|| std::env::var("UPKEEP_CONFIG").ok());
    let config = upkeep_core::UpkeepConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        upkeep_core::UpkeepConfig::default()
    });

    let bind = config.server.bind.clone();
    let port = config.server.port;

    // single SQLite file for all subsystems
    let db_path = config.database.path.clone();
    ensure_parent_dir(&db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(&db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

    // run all schema migrations (idempotent)
    upkeep_users::db::init_db(&db)?;
    upkeep_workorders::db::init_db(&db)?;
    upkeep_pm::db::init_db(&db)?;
    upkeep_notify::db::init_db(&db)?;
    info!("database migrations complete");

    // each store gets its own connection for thread safety
    let users = upkeep_users::UserStore::new(rusqlite::Connection::open(&db_path)?);
    let work_orders = upkeep_workorders::WorkOrderStore::new(rusqlite::Connection::open(&db_path)?);
    let pm = upkeep_pm::PmStore::new(rusqlite::Connection::open(&db_path)?);
    let notify = upkeep_notify::NotifyStore::new(rusqlite::Connection::open(&db_path)?);

    let state = Arc::new(app::AppState {
        config,
        users,
        work_orders,
        pm,
        notify,
    });
    let router = app::build_router(state);

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("Upkeep gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

/// Ensure the parent directory for a file path exists.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
