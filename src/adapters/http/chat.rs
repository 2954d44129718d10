//! HTTP handler for the streaming chat relay.

use axum::extract::{Json, State};
use axum::response::sse::{Event, Sse};
use futures::{Stream, StreamExt};
use std::convert::Infallible;

use super::dto::ChatRequest;
use super::error::ApiError;
use super::AppState;
use crate::application::{ChatCommand, ChatRelay};

/// POST /api/chat - Run one streaming chat turn.
///
/// Answers `text/event-stream`; each event's data is one JSON wire
/// event with `type` of `text`, `done` or `error`. Failures before the
/// first fragment produce a JSON error response instead; once the
/// stream has started, failures arrive in-band.
///
/// # Errors
/// - 400 Bad Request: missing or blank message
/// - 500 Internal Server Error: missing credential, provider rejection
pub async fn relay_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let command = ChatCommand {
        message: request.message.unwrap_or_default(),
        history: request.history.into_iter().map(Into::into).collect(),
        trip_id: request.trip_id,
    };

    let relay = ChatRelay::new(state.generation.clone(), state.store.clone());
    let events = relay.handle(command).await?;

    let sse = events.map(|event| Ok(Event::default().data(event.to_json())));
    Ok(Sse::new(sse))
}
