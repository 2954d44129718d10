//! Mock generation provider for testing.
//!
//! Scripted replies are consumed in order, allowing tests to run the
//! relay without calling the real API. Calls are recorded for
//! verification.

use async_trait::async_trait;
use futures::stream;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::ports::{ChatMessage, FragmentStream, GenerationError, GenerationProvider};

/// One scripted reply for the mock provider.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Stream these fragments, then end the stream normally.
    Fragments(Vec<String>),
    /// Stream these fragments, then fail mid-stream.
    FragmentsThenError(Vec<String>, GenerationError),
    /// Fail before the stream starts.
    Failure(GenerationError),
}

/// A recorded streaming call.
#[derive(Debug, Clone)]
pub struct RecordedChat {
    pub system_instruction: String,
    pub history: Vec<ChatMessage>,
    pub new_message: String,
}

/// Mock generation provider.
#[derive(Debug, Clone, Default)]
pub struct MockGenerationProvider {
    /// Pre-configured replies (consumed in order).
    replies: Arc<Mutex<VecDeque<ScriptedReply>>>,
    /// Recorded streaming calls.
    chat_calls: Arc<Mutex<Vec<RecordedChat>>>,
    /// Recorded single-shot prompts.
    once_calls: Arc<Mutex<Vec<String>>>,
}

impl MockGenerationProvider {
    /// Creates a new mock provider with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a reply streamed as the given fragments.
    pub fn with_fragments<I, S>(self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.replies
            .lock()
            .unwrap()
            .push_back(ScriptedReply::Fragments(
                fragments.into_iter().map(Into::into).collect(),
            ));
        self
    }

    /// Queues a reply that fails mid-stream after the given fragments.
    pub fn with_midstream_error<I, S>(self, fragments: I, error: GenerationError) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.replies
            .lock()
            .unwrap()
            .push_back(ScriptedReply::FragmentsThenError(
                fragments.into_iter().map(Into::into).collect(),
                error,
            ));
        self
    }

    /// Queues a pre-stream failure.
    pub fn with_failure(self, error: GenerationError) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(ScriptedReply::Failure(error));
        self
    }

    /// Returns the recorded streaming calls.
    pub fn chat_calls(&self) -> Vec<RecordedChat> {
        self.chat_calls.lock().unwrap().clone()
    }

    /// Returns the recorded single-shot prompts.
    pub fn once_calls(&self) -> Vec<String> {
        self.once_calls.lock().unwrap().clone()
    }

    fn next_reply(&self) -> ScriptedReply {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ScriptedReply::Fragments(vec!["ok".to_string()]))
    }
}

#[async_trait]
impl GenerationProvider for MockGenerationProvider {
    async fn generate_once(&self, prompt: &str) -> Result<String, GenerationError> {
        self.once_calls.lock().unwrap().push(prompt.to_string());

        match self.next_reply() {
            ScriptedReply::Fragments(fragments) => Ok(fragments.concat()),
            ScriptedReply::FragmentsThenError(_, error) | ScriptedReply::Failure(error) => {
                Err(error)
            }
        }
    }

    async fn stream_chat(
        &self,
        system_instruction: &str,
        history: &[ChatMessage],
        new_message: &str,
    ) -> Result<FragmentStream, GenerationError> {
        self.chat_calls.lock().unwrap().push(RecordedChat {
            system_instruction: system_instruction.to_string(),
            history: history.to_vec(),
            new_message: new_message.to_string(),
        });

        let items: Vec<Result<String, GenerationError>> = match self.next_reply() {
            ScriptedReply::Fragments(fragments) => fragments.into_iter().map(Ok).collect(),
            ScriptedReply::FragmentsThenError(fragments, error) => fragments
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(error)))
                .collect(),
            ScriptedReply::Failure(error) => return Err(error),
        };

        Ok(Box::pin(stream::iter(items)))
    }
}
