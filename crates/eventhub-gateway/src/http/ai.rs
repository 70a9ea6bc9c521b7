//! AI add-on routes. Provider failures never surface as errors here; the
//! assistant degrades to fallback content instead.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};
use chrono::Utc;
use eventhub_agent::assistant::{
    CHAT_RSVP_LIMIT, CHAT_UPCOMING_LIMIT, SUGGESTION_HISTORY_LIMIT, SUGGESTION_UPCOMING_LIMIT,
};
use eventhub_agent::{ChatMessage, ChatReply, Suggestions};
use serde::Deserialize;
use std::sync::Arc;

use crate::app::AppState;
use crate::http::{blocking, caller, error::ApiError};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub chat_history: Vec<ChatMessage>,
}

/// GET /ai/suggestions
pub async fn suggestions(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Suggestions>, ApiError> {
    let caller = caller(&state, &headers)?;
    let store = state.workflow.store().clone();
    let (history, upcoming) = blocking(move || {
        let history = store.rsvps_for_user(&caller.id, Some(SUGGESTION_HISTORY_LIMIT))?;
        let upcoming = store.upcoming_approved(Utc::now(), SUGGESTION_UPCOMING_LIMIT)?;
        Ok::<_, rusqlite::Error>((history, upcoming))
    })
    .await?;
    Ok(Json(state.assistant.suggest(&history, &upcoming).await))
}

/// POST /ai/chat
pub async fn chat(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let caller = caller(&state, &headers)?;
    let Json(body) = body?;
    if body.message.trim().is_empty() {
        return Err(ApiError::bad_request("Message is required"));
    }

    let store = state.workflow.store().clone();
    let user_id = caller.id.clone();
    let (past, upcoming) = blocking(move || {
        let past = store.rsvps_for_user(&user_id, Some(CHAT_RSVP_LIMIT))?.len();
        let upcoming = store.upcoming_approved(Utc::now(), CHAT_UPCOMING_LIMIT)?;
        Ok::<_, rusqlite::Error>((past, upcoming))
    })
    .await?;
    let reply = state
        .assistant
        .chat(&caller, &body.message, &body.chat_history, past, &upcoming)
        .await;
    Ok(Json(reply))
}
