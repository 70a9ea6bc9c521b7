use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use clap::Parser;
use eventhub_core::config::EventHubConfig;
use eventhub_core::mail::LogMailer;
use eventhub_gateway::app::{self, AppState};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "eventhub-gateway", version, about = "EventHub REST + WebSocket server")]
struct Args {
    /// Path to eventhub.toml (overrides EVENTHUB_CONFIG).
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eventhub_gateway=info,tower_http=debug".into()),
        )
        .init();

    let args = Args::parse();

    // explicit path > EVENTHUB_CONFIG env > ~/.eventhub/eventhub.toml
    let config = EventHubConfig::load(args.config.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        EventHubConfig::default()
    });
    if config.auth.jwt_secret == eventhub_core::config::DEFAULT_JWT_SECRET {
        warn!("using the default JWT secret; set EVENTHUB_AUTH__JWT_SECRET in production");
    }

    let db_path = config.database.path.clone();
    ensure_parent_dir(&db_path);
    info!(path = %db_path, "opening SQLite database");
    let db = rusqlite::Connection::open(&db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

    // schema migrations (idempotent); users first, events reference them
    eventhub_users::db::init_db(&db)?;
    eventhub_events::db::init_db(&db)?;
    info!("database migrations complete");

    let mailer = Arc::new(LogMailer::new(config.mail.from.clone()));
    let provider = app::build_provider(&config.ai);
    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;

    let state = Arc::new(AppState::new(config, Arc::new(Mutex::new(db)), mailer, provider));
    let router = app::build_router(Arc::clone(&state));

    info!("EventHub gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&state)))
        .await?;

    info!("gateway stopped");
    Ok(())
}

/// Resolves on Ctrl-C. Closing the registry first lets open sockets finish,
/// which graceful shutdown waits for.
async fn shutdown_signal(state: Arc<AppState>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
    state.registry.close_all();
}

fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }
}
