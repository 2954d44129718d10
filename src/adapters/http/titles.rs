//! HTTP handler for trip title generation.

use axum::extract::{Json, State};

use super::dto::{TitleRequest, TitleResponse};
use super::error::ApiError;
use super::AppState;
use crate::application::{TitleCommand, TitleGenerator};

/// POST /api/auto-title - Generate and record a trip title.
///
/// One blocking model call over the opening exchange; the result is
/// written onto the trip row when the store is configured, and
/// returned either way.
///
/// # Errors
/// - 400 Bad Request: missing `tripId`
/// - 500 Internal Server Error: missing credential, provider failure
pub async fn auto_title(
    State(state): State<AppState>,
    Json(request): Json<TitleRequest>,
) -> Result<Json<TitleResponse>, ApiError> {
    let trip_id = request
        .trip_id
        .ok_or_else(|| ApiError::validation("tripId required"))?;

    let command = TitleCommand {
        trip_id,
        user_message: request.user_message.unwrap_or_default(),
        assistant_message: request.assistant_message.unwrap_or_default(),
    };

    let generator = TitleGenerator::new(state.generation.clone(), state.store.clone());
    let title = generator.handle(command).await?;

    Ok(Json(TitleResponse { title }))
}
