//! HTTP surface - axum routes over the application layer.
//!
//! Every route rides behind a permissive CORS layer (the service is
//! called directly from browsers) and request tracing. Non-streaming
//! routes also get a request timeout; the chat route must outlive it,
//! since a turn streams for as long as generation runs.

mod chat;
mod dto;
mod error;
mod messages;
mod titles;
mod trips;

pub use dto::ErrorResponse;
pub use error::ApiError;

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::ports::{GenerationProvider, RowStore};

/// Shared application state.
///
/// Both handles are built once at startup and never mutated; a missing
/// handle means the matching capability is degraded, not broken.
#[derive(Clone)]
pub struct AppState {
    pub generation: Option<Arc<dyn GenerationProvider>>,
    pub store: Option<Arc<dyn RowStore>>,
}

impl AppState {
    /// Creates application state from the configured handles.
    pub fn new(
        generation: Option<Arc<dyn GenerationProvider>>,
        store: Option<Arc<dyn RowStore>>,
    ) -> Self {
        Self { generation, store }
    }
}

/// Builds the service router.
///
/// Endpoints:
/// - POST /api/chat - streaming chat relay (SSE)
/// - POST /api/auto-title - trip title generation
/// - GET/POST /api/messages - message listing and creation
/// - GET/POST/DELETE /api/trips - trip CRUD
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    let crud_routes = Router::new()
        .route("/api/auto-title", post(titles::auto_title))
        .route(
            "/api/messages",
            get(messages::list_messages).post(messages::create_message),
        )
        .route(
            "/api/trips",
            get(trips::get_trips)
                .post(trips::create_trip)
                .delete(trips::delete_trip),
        )
        .layer(TimeoutLayer::new(request_timeout));

    Router::new()
        .route("/api/chat", post(chat::relay_chat))
        .merge(crud_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

/// Permissive CORS: any origin, the methods each endpoint serves, and
/// any requested headers. Also answers OPTIONS preflight.
fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn router_builds_with_empty_state() {
        let state = AppState::new(None, None);
        let _router = router(state, Duration::from_secs(30));
    }
}
