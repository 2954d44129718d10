//! Generation Provider Port - interface to the remote text-generation
//! service.
//!
//! The relay uses the streaming call for chat turns and the single-shot
//! call for title generation. Implementations translate between the
//! provider wire format and these types.

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// A finite stream of generated text fragments.
///
/// The stream is consumed exactly once per request. A mid-stream
/// provider failure is delivered as a terminal `Err` item rather than a
/// panic, so the consumer can convert it into an in-band wire event.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, GenerationError>> + Send>>;

/// Port for text-generation provider interactions.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate a single completion (non-streaming).
    ///
    /// Used for title generation, where streaming overhead buys nothing.
    async fn generate_once(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Start a streaming multi-turn chat completion.
    ///
    /// `history` is the prior conversation in order; `new_message` is
    /// the current user turn. Fragments arrive in generation order.
    async fn stream_chat(
        &self,
        system_instruction: &str,
        history: &[ChatMessage],
        new_message: &str,
    ) -> Result<FragmentStream, GenerationError>;
}

/// One prior turn of conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who authored the turn.
    pub role: ChatRole,
    /// Turn content.
    pub content: String,
}

impl ChatMessage {
    /// Creates a user-authored turn.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// Creates an assistant-authored turn.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Role of a history turn.
///
/// Providers with a different role vocabulary map these at the wire
/// boundary (the Gemini adapter sends assistant turns as role `model`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// Generation provider errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenerationError {
    /// Request timed out.
    #[error("request timed out after {timeout_secs}s")]
    Timeout {
        /// Configured timeout.
        timeout_secs: u32,
    },

    /// Network error during request.
    #[error("network error: {0}")]
    Network(String),

    /// API key was rejected.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Rate limited by the provider.
    #[error("rate limited by provider")]
    RateLimited,

    /// Provider rejected the request payload.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Provider is unavailable.
    #[error("provider unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// Failed to parse the provider response.
    #[error("parse error: {0}")]
    Parse(String),
}

impl GenerationError {
    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Maps a non-success HTTP status to the matching error variant.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::AuthenticationFailed,
            429 => Self::RateLimited,
            400 => Self::InvalidRequest(body),
            500..=599 => Self::unavailable(format!("server error {status}: {body}")),
            _ => Self::network(format!("unexpected status {status}: {body}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_message_constructors_set_roles() {
        assert_eq!(ChatMessage::user("hi").role, ChatRole::User);
        assert_eq!(ChatMessage::assistant("hello").role, ChatRole::Assistant);
    }

    #[test]
    fn chat_role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&ChatRole::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&ChatRole::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn from_status_maps_auth_failures() {
        assert!(matches!(
            GenerationError::from_status(401, String::new()),
            GenerationError::AuthenticationFailed
        ));
        assert!(matches!(
            GenerationError::from_status(403, String::new()),
            GenerationError::AuthenticationFailed
        ));
    }

    #[test]
    fn from_status_maps_rate_limit_and_bad_request() {
        assert!(matches!(
            GenerationError::from_status(429, String::new()),
            GenerationError::RateLimited
        ));
        assert!(matches!(
            GenerationError::from_status(400, "bad".to_string()),
            GenerationError::InvalidRequest(_)
        ));
    }

    #[test]
    fn from_status_maps_server_errors_to_unavailable() {
        assert!(matches!(
            GenerationError::from_status(503, "down".to_string()),
            GenerationError::Unavailable { .. }
        ));
    }

    #[test]
    fn errors_display_useful_messages() {
        let err = GenerationError::Timeout { timeout_secs: 60 };
        assert_eq!(err.to_string(), "request timed out after 60s");

        let err = GenerationError::unavailable("overloaded");
        assert_eq!(err.to_string(), "provider unavailable: overloaded");
    }
}
