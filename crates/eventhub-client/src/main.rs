use std::sync::Arc;

use clap::{Parser, Subcommand};
use eventhub_client::stream::{Handler, WsConnector};
use eventhub_client::{
    ApiClient, ClientConfig, ClientError, LocalState, Reconcile, SessionStore, StreamClient,
};
use eventhub_core::types::Role;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "eventhub-watch", version, about = "EventHub live event feed")]
struct Args {
    /// Path to client.toml.
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and persist the session.
    Login { email: String, password: String },
    /// Create an account and persist the session.
    Signup {
        email: String,
        password: String,
        /// ADMIN, ORGANIZER or ATTENDEE.
        #[arg(long)]
        role: Option<Role>,
    },
    /// Forget the persisted session.
    Logout,
    /// Load events and follow live updates until Ctrl-C.
    Watch,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eventhub_client=info,eventhub_watch=info".into()),
        )
        .init();

    let args = Args::parse();
    let config = ClientConfig::load(args.config.as_deref())?;
    let sessions = SessionStore::new(&config.session_path);
    let api = ApiClient::new(&config.api_base);

    match args.command {
        Command::Login { email, password } => {
            let session = api.login(&email, &password).await?;
            sessions.save(&session)?;
            info!(email = %session.user.email, role = %session.user.role, "logged in");
        }
        Command::Signup { email, password, role } => {
            let session = api.signup(&email, &password, role).await?;
            sessions.save(&session)?;
            info!(email = %session.user.email, role = %session.user.role, "signed up");
        }
        Command::Logout => {
            sessions.clear()?;
            info!("logged out");
        }
        Command::Watch => watch(&config, &sessions).await?,
    }
    Ok(())
}

async fn watch(config: &ClientConfig, sessions: &SessionStore) -> anyhow::Result<()> {
    let session = sessions.load()?.ok_or(ClientError::NoSession)?;
    let api = ApiClient::new(&config.api_base).with_token(&session.token);

    let mut state = LocalState::new(api.events().await?, api.my_rsvps().await?);
    info!(
        events = state.events.len(),
        rsvps = state.my_rsvps.len(),
        "initial state loaded"
    );

    let (tx, mut rx) = mpsc::unbounded_channel();
    let handler: Handler = Arc::new(move |envelope| {
        let _ = tx.send(envelope);
    });
    let stream = StreamClient::spawn(Arc::new(WsConnector), config.retry_policy(), handler);
    stream.set_endpoint(Some(config.ws_url.clone()));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                stream.shutdown().await;
                break;
            }
            Some(envelope) = rx.recv() => {
                let outcome = state.apply(&envelope);
                if outcome == Reconcile::RefetchRsvps {
                    match api.my_rsvps().await {
                        Ok(rsvps) => state.replace_rsvps(rsvps),
                        Err(e) => warn!(error = %e, "failed to refresh RSVPs"),
                    }
                }
                info!(
                    kind = %envelope.kind,
                    id = envelope.payload_id().unwrap_or("-"),
                    ?outcome,
                    events = state.events.len(),
                    rsvps = state.my_rsvps.len(),
                    "update"
                );
            }
        }
    }
    Ok(())
}
