use std::sync::{Arc, Mutex};

use axum::{
    routing::{get, post, put},
    Router,
};
use eventhub_agent::{Assistant, LlmProvider, OpenAiProvider, UnconfiguredProvider};
use eventhub_core::config::{AiConfig, EventHubConfig};
use eventhub_core::mail::Mailer;
use eventhub_events::{EventStore, Workflow};
use eventhub_users::{TokenService, UserStore};
use rusqlite::Connection;
use tracing::info;

use crate::http;
use crate::ws::registry::ClientRegistry;

/// Central shared state, passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: EventHubConfig,
    pub users: UserStore,
    pub workflow: Workflow,
    /// Live push-channel connections; also the workflow's broadcaster.
    pub registry: Arc<ClientRegistry>,
    pub assistant: Assistant,
}

impl AppState {
    /// Wire every subsystem over one shared connection. The schema must
    /// already be initialised.
    pub fn new(
        config: EventHubConfig,
        db: Arc<Mutex<Connection>>,
        mailer: Arc<dyn Mailer>,
        provider: Arc<dyn LlmProvider>,
    ) -> Self {
        let registry = Arc::new(ClientRegistry::new());
        let tokens = TokenService::new(&config.auth.jwt_secret, config.auth.token_ttl_hours);
        let users = UserStore::new(Arc::clone(&db), tokens, Arc::clone(&mailer));
        let workflow = Workflow::new(EventStore::new(db), registry.clone(), mailer);
        let assistant = Assistant::new(provider, config.ai.model.clone());
        Self {
            config,
            users,
            workflow,
            registry,
            assistant,
        }
    }
}

/// Pick the LLM backend: OpenAI-compatible when a key is configured,
/// otherwise a stand-in that always fails so the AI routes use their fallbacks.
pub fn build_provider(ai: &AiConfig) -> Arc<dyn LlmProvider> {
    match ai.api_key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => {
            info!(base_url = %ai.base_url, model = %ai.model, "LLM provider: OpenAI-compatible");
            Arc::new(OpenAiProvider::new(key.to_string(), Some(ai.base_url.clone())))
        }
        _ => {
            info!("no AI api key configured, AI routes will use fallback responses");
            Arc::new(UnconfiguredProvider)
        }
    }
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/signup", post(http::auth::signup))
        .route("/login", post(http::auth::login))
        .route(
            "/events",
            get(http::events::list_events).post(http::events::create_event),
        )
        .route("/events/pending", get(http::events::pending_events))
        .route(
            "/events/{id}",
            put(http::events::update_event).delete(http::events::delete_event),
        )
        .route("/events/{id}/approve", put(http::events::approve_event))
        .route("/events/{id}/rsvp", post(http::rsvps::upsert_rsvp))
        .route("/events/{id}/rsvps", get(http::rsvps::event_rsvps))
        .route("/my-rsvps", get(http::rsvps::my_rsvps))
        .route("/ai/suggestions", get(http::ai::suggestions))
        .route("/ai/chat", post(http::ai::chat))
}

/// Assemble the full Axum router: REST under the configured prefix,
/// `/ws` and `/health` at the root.
pub fn build_router(state: Arc<AppState>) -> Router {
    let prefix = state.config.gateway.api_prefix.trim_end_matches('/').to_string();
    let router = Router::new()
        .route("/health", get(http::health::health_handler))
        .route("/ws", get(crate::ws::connection::ws_handler));

    // axum refuses to nest at the root
    let router = if prefix.is_empty() {
        router.merge(api_routes())
    } else {
        router.nest(&prefix, api_routes())
    };

    router
        .with_state(state)
        .layer(tower_http::cors::CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
