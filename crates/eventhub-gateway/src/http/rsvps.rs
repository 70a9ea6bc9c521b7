use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use eventhub_core::types::Rsvp;
use eventhub_events::RsvpRequest;
use std::sync::Arc;

use crate::app::AppState;
use crate::http::{blocking, caller, error::ApiError};

/// POST /events/{id}/rsvp: 201 when a new RSVP was created, 200 when replaced.
pub async fn upsert_rsvp(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(event_id): Path<String>,
    body: Result<Json<RsvpRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Rsvp>), ApiError> {
    let caller = caller(&state, &headers)?;
    let Json(req) = body?;
    let outcome = blocking(move || state.workflow.upsert_rsvp(&caller, &event_id, req)).await?;
    let status = if outcome.inserted {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome.rsvp)))
}

/// GET /events/{id}/rsvps
pub async fn event_rsvps(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(event_id): Path<String>,
) -> Result<Json<Vec<Rsvp>>, ApiError> {
    let caller = caller(&state, &headers)?;
    Ok(Json(
        blocking(move || state.workflow.event_rsvps(&caller, &event_id)).await?,
    ))
}

/// GET /my-rsvps: the caller's RSVPs with their events embedded.
pub async fn my_rsvps(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Rsvp>>, ApiError> {
    let caller = caller(&state, &headers)?;
    Ok(Json(blocking(move || state.workflow.my_rsvps(&caller)).await?))
}
