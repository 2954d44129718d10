//! HTTP DTOs for the tripmate endpoints.
//!
//! Request and response bodies use camelCase on the wire while
//! persisted rows stay snake_case; these types are the boundary.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::application::HistoryEntry;
use crate::domain::{MessageRole, MessageType};

// ════════════════════════════════════════════════════════════════════════════════
// Chat
// ════════════════════════════════════════════════════════════════════════════════

/// Body of POST /api/chat.
///
/// `message` stays optional at the serde layer so a missing field
/// reaches the relay's own validation (and its 400) instead of a
/// deserialization rejection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub history: Vec<HistoryItem>,
    #[serde(default)]
    pub trip_id: Option<Uuid>,
}

/// One prior turn in the request history.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryItem {
    pub role: String,
    pub content: String,
}

impl From<HistoryItem> for HistoryEntry {
    fn from(item: HistoryItem) -> Self {
        Self {
            role: item.role,
            content: item.content,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Titles
// ════════════════════════════════════════════════════════════════════════════════

/// Body of POST /api/auto-title.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleRequest {
    #[serde(default)]
    pub trip_id: Option<Uuid>,
    #[serde(default)]
    pub user_message: Option<String>,
    #[serde(default)]
    pub assistant_message: Option<String>,
}

/// Response of POST /api/auto-title.
#[derive(Debug, Clone, Serialize)]
pub struct TitleResponse {
    pub title: String,
}

// ════════════════════════════════════════════════════════════════════════════════
// Trips
// ════════════════════════════════════════════════════════════════════════════════

/// Body of POST /api/trips.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTripRequest {
    #[serde(default)]
    pub title: Option<String>,
    pub destination: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Query parameters of GET/DELETE /api/trips.
#[derive(Debug, Clone, Deserialize)]
pub struct TripQuery {
    #[serde(default)]
    pub id: Option<Uuid>,
}

/// Response of DELETE /api/trips.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub ok: bool,
}

// ════════════════════════════════════════════════════════════════════════════════
// Messages
// ════════════════════════════════════════════════════════════════════════════════

/// Query parameters of /api/messages.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageQuery {
    #[serde(default)]
    pub trip_id: Option<Uuid>,
}

/// Body of POST /api/messages.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMessageRequest {
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub message_type: Option<MessageType>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════════

/// Standard error body: `{"error": "..."}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    /// Creates an error body.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
