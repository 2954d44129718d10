//! Message entity and reply classification.
//!
//! A message row is written once per conversation turn and never
//! mutated. The assistant's accumulated reply is classified by scanning
//! for fenced card blocks; the parsed payload becomes the row metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Table name for messages in the row store.
pub const MESSAGES_TABLE: &str = "messages";

/// Opening fence of an embedded itinerary card.
pub const ITINERARY_FENCE: &str = "```itinerary";

/// Opening fence of an embedded packing-list card.
pub const PACKING_FENCE: &str = "```packing";

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// How the client should render a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Plain conversational text.
    #[default]
    Text,
    /// Reply carrying a structured itinerary block.
    ItineraryCard,
    /// Reply carrying a structured packing-list block.
    PackingCard,
}

/// A single conversation message, as persisted in the row store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message id.
    pub id: Uuid,
    /// Trip this message belongs to.
    pub trip_id: Uuid,
    /// Who authored the message.
    pub role: MessageRole,
    /// Full message text.
    pub content: String,
    /// Render hint derived from the content.
    pub message_type: MessageType,
    /// Structured payload extracted from a card block, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// When the row was created; replay order within a trip.
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Creates an inbound user message.
    pub fn user(trip_id: Uuid, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            trip_id,
            role: MessageRole::User,
            content: content.into(),
            message_type: MessageType::Text,
            metadata: None,
            created_at: Utc::now(),
        }
    }

    /// Creates an outbound assistant message with a classified type.
    pub fn assistant(
        trip_id: Uuid,
        content: impl Into<String>,
        message_type: MessageType,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            trip_id,
            role: MessageRole::Assistant,
            content: content.into(),
            message_type,
            metadata,
            created_at: Utc::now(),
        }
    }

    /// Creates a message from explicit fields, as accepted over the API.
    pub fn from_parts(
        trip_id: Uuid,
        role: MessageRole,
        content: impl Into<String>,
        message_type: MessageType,
        metadata: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            trip_id,
            role,
            content: content.into(),
            message_type,
            metadata,
            created_at: Utc::now(),
        }
    }

    /// Serializes the message into a row-store row.
    pub fn into_row(self) -> serde_json::Value {
        serde_json::to_value(self).expect("message serializes to JSON")
    }
}

/// Classifies an assistant reply by its first embedded card block.
///
/// The itinerary fence is checked before the packing fence; the first
/// matching marker type governs the result. When the fenced payload is
/// not valid JSON the reply stays plain text with no metadata — the
/// turn itself still succeeds.
pub fn classify_reply(reply: &str) -> (MessageType, Option<serde_json::Value>) {
    let candidates = [
        (ITINERARY_FENCE, MessageType::ItineraryCard),
        (PACKING_FENCE, MessageType::PackingCard),
    ];

    for (fence, message_type) in candidates {
        let Some(body) = extract_fenced_block(reply, fence) else {
            continue;
        };
        return match serde_json::from_str(body) {
            Ok(payload) => (message_type, Some(payload)),
            Err(err) => {
                tracing::debug!(fence, error = %err, "card block payload is not valid JSON");
                (MessageType::Text, None)
            }
        };
    }

    (MessageType::Text, None)
}

/// Returns the text between a fence marker line and the closing fence.
fn extract_fenced_block<'a>(text: &'a str, fence: &str) -> Option<&'a str> {
    let start = text.find(fence)?;
    let after_marker = &text[start + fence.len()..];
    let body = &after_marker[after_marker.find('\n')? + 1..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}
