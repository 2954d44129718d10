//! HTTP handlers for message listing and creation.

use axum::extract::{Json, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::Value;
use uuid::Uuid;

use super::dto::{CreateMessageRequest, MessageQuery};
use super::error::ApiError;
use super::trips::require_store;
use super::AppState;
use crate::domain::{Message, MESSAGES_TABLE};
use crate::ports::{Filter, Order};

/// GET /api/messages - List a trip's messages.
///
/// Rows come back in ascending creation-time order, the conversation
/// replay order.
///
/// # Errors
/// - 400 Bad Request: missing `tripId` query parameter
pub async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
) -> Result<Json<Value>, ApiError> {
    let store = require_store(&state)?;
    let trip_id = require_trip_id(query.trip_id)?;

    let rows = store
        .select(
            MESSAGES_TABLE,
            &Filter::new().eq("trip_id", trip_id),
            Some(&Order::asc("created_at")),
        )
        .await?;

    Ok(Json(Value::Array(rows)))
}

/// POST /api/messages - Record a message for a trip.
///
/// The message type defaults to plain text.
pub async fn create_message(
    State(state): State<AppState>,
    Query(query): Query<MessageQuery>,
    Json(request): Json<CreateMessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let store = require_store(&state)?;
    let trip_id = require_trip_id(query.trip_id)?;

    let message = Message::from_parts(
        trip_id,
        request.role,
        request.content,
        request.message_type.unwrap_or_default(),
        request.metadata,
    );
    let created = store.insert(MESSAGES_TABLE, message.into_row()).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

fn require_trip_id(trip_id: Option<Uuid>) -> Result<Uuid, ApiError> {
    trip_id.ok_or_else(|| ApiError::validation("tripId required"))
}
