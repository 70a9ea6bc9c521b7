use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use eventhub_core::types::Event;
use eventhub_events::{CreateEventRequest, DeleteResponse, UpdateEventRequest};
use std::sync::Arc;

use crate::app::AppState;
use crate::http::{blocking, caller, error::ApiError};

/// GET /events: everything the caller may see, soonest first.
pub async fn list_events(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Event>>, ApiError> {
    let caller = caller(&state, &headers)?;
    Ok(Json(blocking(move || state.workflow.list_events(&caller)).await?))
}

/// GET /events/pending (ADMIN)
pub async fn pending_events(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Event>>, ApiError> {
    let caller = caller(&state, &headers)?;
    Ok(Json(blocking(move || state.workflow.pending_events(&caller)).await?))
}

/// POST /events (ORGANIZER or ADMIN)
pub async fn create_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Result<Json<CreateEventRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let caller = caller(&state, &headers)?;
    // role is checked before the body so attendees get 403 even for bad input
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let event = blocking(move || state.workflow.create_event(&caller, req)).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// PUT /events/{id} (owner or ADMIN)
pub async fn update_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    body: Result<Json<UpdateEventRequest>, JsonRejection>,
) -> Result<Json<Event>, ApiError> {
    let caller = caller(&state, &headers)?;
    let Json(req) = body?;
    Ok(Json(
        blocking(move || state.workflow.update_event(&caller, &id, req)).await?,
    ))
}

/// DELETE /events/{id} (owner or ADMIN)
pub async fn delete_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let caller = caller(&state, &headers)?;
    Ok(Json(blocking(move || state.workflow.delete_event(&caller, &id)).await?))
}

/// PUT /events/{id}/approve (ADMIN)
pub async fn approve_event(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Event>, ApiError> {
    let caller = caller(&state, &headers)?;
    Ok(Json(blocking(move || state.workflow.approve_event(&caller, &id)).await?))
}
