//! HTTP handlers for trip CRUD.

use axum::extract::{Json, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::Value;
use std::sync::Arc;

use super::dto::{CreateTripRequest, DeleteResponse, TripQuery};
use super::error::ApiError;
use super::AppState;
use crate::domain::{Trip, TRIPS_TABLE};
use crate::ports::{Filter, Order, RowStore};

/// GET /api/trips - List trips, or fetch one by id.
///
/// Without `id` answers all trips ordered by creation time descending;
/// with `id` answers the single row.
///
/// # Errors
/// - 404 Not Found: no trip with the given id
/// - 500 Internal Server Error: store unconfigured or failing
pub async fn get_trips(
    State(state): State<AppState>,
    Query(query): Query<TripQuery>,
) -> Result<Json<Value>, ApiError> {
    let store = require_store(&state)?;

    match query.id {
        Some(id) => {
            let row = store
                .select_one(TRIPS_TABLE, &Filter::new().eq("id", id))
                .await?;
            Ok(Json(row))
        }
        None => {
            let rows = store
                .select(
                    TRIPS_TABLE,
                    &Filter::new(),
                    Some(&Order::desc("created_at")),
                )
                .await?;
            Ok(Json(Value::Array(rows)))
        }
    }
}

/// POST /api/trips - Create a trip.
///
/// A missing title falls back to the default; the placeholder user id
/// is stamped on the row.
pub async fn create_trip(
    State(state): State<AppState>,
    Json(request): Json<CreateTripRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let store = require_store(&state)?;

    let trip = Trip::new(
        request.title,
        request.destination,
        request.start_date,
        request.end_date,
    );
    let created = store.insert(TRIPS_TABLE, trip.into_row()).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

/// DELETE /api/trips - Delete a trip by id.
///
/// # Errors
/// - 400 Bad Request: missing `id` query parameter
pub async fn delete_trip(
    State(state): State<AppState>,
    Query(query): Query<TripQuery>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let store = require_store(&state)?;
    let id = query.id.ok_or_else(|| ApiError::validation("id required"))?;

    store
        .delete(TRIPS_TABLE, &Filter::new().eq("id", id))
        .await?;

    Ok(Json(DeleteResponse { ok: true }))
}

/// Returns the store handle or the configuration error.
pub(super) fn require_store(state: &AppState) -> Result<Arc<dyn RowStore>, ApiError> {
    state
        .store
        .clone()
        .ok_or_else(ApiError::store_not_configured)
}
