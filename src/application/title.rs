//! Title generation - one blocking model call plus a trip row update.

use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{title_prompt, TRIPS_TABLE};
use crate::ports::{Filter, GenerationError, GenerationProvider, RowStore};

/// Request to title a trip from its opening exchange.
#[derive(Debug, Clone)]
pub struct TitleCommand {
    /// Trip whose title should be replaced.
    pub trip_id: Uuid,
    /// The user's opening message.
    pub user_message: String,
    /// The assistant's reply (truncated into the prompt).
    pub assistant_message: String,
}

/// Errors from title generation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TitleError {
    /// No generation credential is configured.
    #[error("generation provider is not configured")]
    MissingCredential,

    /// The provider call failed.
    #[error(transparent)]
    Provider(#[from] GenerationError),
}

/// Generates trip titles and writes them onto the trip row.
#[derive(Clone)]
pub struct TitleGenerator {
    generation: Option<Arc<dyn GenerationProvider>>,
    store: Option<Arc<dyn RowStore>>,
}

impl TitleGenerator {
    /// Creates a generator over the given handles.
    pub fn new(
        generation: Option<Arc<dyn GenerationProvider>>,
        store: Option<Arc<dyn RowStore>>,
    ) -> Self {
        Self { generation, store }
    }

    /// Produces a short title and records it on the trip.
    ///
    /// The title write is a side channel like the relay's persistence:
    /// a failed update is logged and the generated title is still
    /// returned to the caller.
    pub async fn handle(&self, command: TitleCommand) -> Result<String, TitleError> {
        let provider = self
            .generation
            .as_ref()
            .ok_or(TitleError::MissingCredential)?;

        let prompt = title_prompt(&command.user_message, &command.assistant_message);
        let title = provider.generate_once(&prompt).await?.trim().to_string();

        if let Some(store) = self.store.as_ref() {
            let patch = serde_json::json!({
                "title": title,
                "updated_at": chrono::Utc::now(),
            });
            let filter = Filter::new().eq("id", command.trip_id);
            if let Err(error) = store.update(TRIPS_TABLE, &filter, patch).await {
                tracing::warn!(trip_id = %command.trip_id, %error, "failed to record trip title");
            }
        }

        Ok(title)
    }
}
