//! Chat relay - the streaming turn orchestrator.
//!
//! A request moves through the phases Validating → Persisting-User →
//! Generating → Streaming → Classifying → Persisting-Assistant →
//! Closed. Failure before streaming begins surfaces as a
//! [`RelayError`]; failure after the first byte is on the wire can only
//! be reported in-band, as a terminal error event.
//!
//! Both persistence phases are side channels of the user-facing turn:
//! an inbound-write failure is logged and the turn proceeds; an
//! outbound-write failure becomes a trailing error event because the
//! already-streamed reply cannot be retracted.

use futures::{Stream, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::domain::{classify_reply, Message, SYSTEM_PROMPT, MESSAGES_TABLE};
use crate::ports::{ChatMessage, FragmentStream, GenerationError, GenerationProvider, RowStore};

/// Buffered wire events between the forwarding task and the response.
const EVENT_CHANNEL_CAPACITY: usize = 16;

/// One turn request, as accepted from the HTTP surface.
#[derive(Debug, Clone)]
pub struct ChatCommand {
    /// The new user message (validated by the relay).
    pub message: String,
    /// Prior conversation, oldest first.
    pub history: Vec<HistoryEntry>,
    /// Trip to record the turn under, if any.
    pub trip_id: Option<Uuid>,
}

/// One history turn as supplied by the caller.
///
/// The role is a free-form string on the wire; anything that is not
/// "assistant" is treated as user-authored.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
}

impl HistoryEntry {
    fn to_chat_message(&self) -> ChatMessage {
        if self.role == "assistant" {
            ChatMessage::assistant(&self.content)
        } else {
            ChatMessage::user(&self.content)
        }
    }
}

/// A wire event of the relay stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChatEvent {
    /// One generated fragment.
    Text { content: String },
    /// Generation finished; always the last event of a successful turn.
    Done,
    /// Terminal in-band failure report.
    Error { content: String },
}

impl ChatEvent {
    /// Creates a text event.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    /// Creates an error event.
    pub fn error(content: impl Into<String>) -> Self {
        Self::Error {
            content: content.into(),
        }
    }

    /// Renders the event as its JSON wire form.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("chat event serializes to JSON")
    }
}

/// Errors that abort the turn before streaming begins.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RelayError {
    /// The message was missing or blank.
    #[error("message is required")]
    EmptyMessage,

    /// No generation credential is configured.
    #[error("generation provider is not configured")]
    MissingCredential,

    /// The provider rejected the turn before any fragment arrived.
    #[error(transparent)]
    Provider(#[from] GenerationError),
}

/// The streaming chat relay.
///
/// Holds the process-wide provider and store handles; both are
/// constructed once at startup and shared across requests.
#[derive(Clone)]
pub struct ChatRelay {
    generation: Option<Arc<dyn GenerationProvider>>,
    store: Option<Arc<dyn RowStore>>,
}

impl ChatRelay {
    /// Creates a relay over the given handles.
    pub fn new(
        generation: Option<Arc<dyn GenerationProvider>>,
        store: Option<Arc<dyn RowStore>>,
    ) -> Self {
        Self { generation, store }
    }

    /// Runs one chat turn.
    ///
    /// Returns the wire-event stream on success. The returned stream
    /// yields `text` events as fragments arrive, then `done`, then — if
    /// recording the assistant reply failed — a trailing `error` event.
    /// A mid-stream provider failure replaces the tail with a single
    /// `error` event.
    pub async fn handle(
        &self,
        command: ChatCommand,
    ) -> Result<impl Stream<Item = ChatEvent>, RelayError> {
        // Validating
        if command.message.trim().is_empty() {
            return Err(RelayError::EmptyMessage);
        }
        let provider = self
            .generation
            .clone()
            .ok_or(RelayError::MissingCredential)?;

        let history: Vec<ChatMessage> = command
            .history
            .iter()
            .map(HistoryEntry::to_chat_message)
            .collect();

        // Persisting-User: best-effort, never aborts the turn.
        if let (Some(trip_id), Some(store)) = (command.trip_id, self.store.as_ref()) {
            let row = Message::user(trip_id, &command.message).into_row();
            if let Err(error) = store.insert(MESSAGES_TABLE, row).await {
                tracing::warn!(%trip_id, %error, "failed to record inbound message");
            }
        }

        // Generating
        let fragments = provider
            .stream_chat(SYSTEM_PROMPT, &history, &command.message)
            .await?;

        // Streaming happens on its own task; dropping the receiver
        // (client disconnect) stops the task at its next send and
        // releases the upstream stream with it.
        let (events, receiver) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        tokio::spawn(forward_stream(
            fragments,
            events,
            self.store.clone(),
            command.trip_id,
        ));

        Ok(ReceiverStream::new(receiver))
    }
}

/// Streaming → Classifying → Persisting-Assistant → Closed.
async fn forward_stream(
    mut fragments: FragmentStream,
    events: mpsc::Sender<ChatEvent>,
    store: Option<Arc<dyn RowStore>>,
    trip_id: Option<Uuid>,
) {
    let mut reply = String::new();

    while let Some(fragment) = fragments.next().await {
        match fragment {
            Ok(text) => {
                if text.is_empty() {
                    continue;
                }
                reply.push_str(&text);
                if events.send(ChatEvent::text(text)).await.is_err() {
                    tracing::debug!("client disconnected mid-stream, dropping upstream");
                    return;
                }
            }
            Err(error) => {
                tracing::error!(%error, "generation failed mid-stream");
                let _ = events.send(ChatEvent::error(error.to_string())).await;
                return;
            }
        }
    }

    if events.send(ChatEvent::Done).await.is_err() {
        return;
    }

    // Classifying + Persisting-Assistant. The reply has already been
    // delivered, so a failed insert can only be reported in-band.
    if let (Some(trip_id), Some(store)) = (trip_id, store) {
        let (message_type, metadata) = classify_reply(&reply);
        let row = Message::assistant(trip_id, &reply, message_type, metadata).into_row();
        if let Err(error) = store.insert(MESSAGES_TABLE, row).await {
            tracing::warn!(%trip_id, %error, "failed to record assistant message");
            let _ = events.send(ChatEvent::error(error.to_string())).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::MockGenerationProvider;
    use crate::adapters::store::InMemoryRowStore;
    use crate::domain::TRIPS_TABLE;
    use crate::ports::{Filter, Order};

    fn command(message: &str, trip_id: Option<Uuid>) -> ChatCommand {
        ChatCommand {
            message: message.to_string(),
            history: Vec::new(),
            trip_id,
        }
    }

    fn relay_with(
        provider: MockGenerationProvider,
        store: InMemoryRowStore,
    ) -> (ChatRelay, InMemoryRowStore) {
        let relay = ChatRelay::new(
            Some(Arc::new(provider)),
            Some(Arc::new(store.clone())),
        );
        (relay, store)
    }

    async fn collect(relay: &ChatRelay, command: ChatCommand) -> Vec<ChatEvent> {
        relay
            .handle(command)
            .await
            .expect("stream starts")
            .collect()
            .await
    }

    #[tokio::test]
    async fn streams_fragments_then_done() {
        let provider = MockGenerationProvider::new().with_fragments(["안녕", "하세요"]);
        let (relay, _) = relay_with(provider, InMemoryRowStore::new());

        let events = collect(&relay, command("3박4일 부산 여행 짜줘", None)).await;

        assert_eq!(
            events,
            vec![
                ChatEvent::text("안녕"),
                ChatEvent::text("하세요"),
                ChatEvent::Done,
            ]
        );
    }

    #[tokio::test]
    async fn empty_message_fails_without_side_effects() {
        let provider = MockGenerationProvider::new();
        let (relay, store) = relay_with(provider, InMemoryRowStore::new());

        let result = relay.handle(command("   ", Some(Uuid::new_v4()))).await;

        assert!(matches!(result, Err(RelayError::EmptyMessage)));
        assert_eq!(store.total_rows(), 0);
    }

    #[tokio::test]
    async fn missing_credential_fails_before_streaming() {
        let relay = ChatRelay::new(None, None);
        let result = relay.handle(command("부산 여행", None)).await;
        assert!(matches!(result, Err(RelayError::MissingCredential)));
    }

    #[tokio::test]
    async fn persists_user_and_assistant_messages_in_order() {
        let trip_id = Uuid::new_v4();
        let provider = MockGenerationProvider::new().with_fragments(["해운대 ", "일정이에요"]);
        let (relay, store) = relay_with(provider, InMemoryRowStore::new());

        let events = collect(&relay, command("3박4일 부산 여행 짜줘", Some(trip_id))).await;
        assert_eq!(events.last(), Some(&ChatEvent::Done));

        let rows = store
            .select(
                MESSAGES_TABLE,
                &Filter::new().eq("trip_id", trip_id),
                Some(&Order::asc("created_at")),
            )
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["role"], "user");
        assert_eq!(rows[0]["content"], "3박4일 부산 여행 짜줘");
        assert_eq!(rows[1]["role"], "assistant");
        assert_eq!(rows[1]["content"], "해운대 일정이에요");
    }

    #[tokio::test]
    async fn streamed_text_equals_persisted_assistant_content() {
        let trip_id = Uuid::new_v4();
        let provider =
            MockGenerationProvider::new().with_fragments(["부", "산", " 여행", " 계획"]);
        let (relay, store) = relay_with(provider, InMemoryRowStore::new());

        let events = collect(&relay, command("여행 짜줘", Some(trip_id))).await;

        let streamed: String = events
            .iter()
            .filter_map(|event| match event {
                ChatEvent::Text { content } => Some(content.as_str()),
                _ => None,
            })
            .collect();

        let rows = store
            .select(
                MESSAGES_TABLE,
                &Filter::new().eq("role", "assistant"),
                None,
            )
            .await
            .unwrap();
        assert_eq!(rows[0]["content"], serde_json::json!(streamed));
    }

    #[tokio::test]
    async fn classifies_itinerary_reply_before_persisting() {
        let trip_id = Uuid::new_v4();
        let provider = MockGenerationProvider::new().with_fragments([
            "일정입니다.\n```itinerary\n",
            "{\"days\": [{\"day\": 1}]}",
            "\n```",
        ]);
        let (relay, store) = relay_with(provider, InMemoryRowStore::new());

        collect(&relay, command("일정 짜줘", Some(trip_id))).await;

        let rows = store
            .select(
                MESSAGES_TABLE,
                &Filter::new().eq("role", "assistant"),
                None,
            )
            .await
            .unwrap();
        assert_eq!(rows[0]["message_type"], "itinerary_card");
        assert_eq!(rows[0]["metadata"]["days"][0]["day"], 1);
    }

    #[tokio::test]
    async fn malformed_card_payload_persists_as_text() {
        let trip_id = Uuid::new_v4();
        let provider = MockGenerationProvider::new()
            .with_fragments(["```itinerary\n{broken json\n```"]);
        let (relay, store) = relay_with(provider, InMemoryRowStore::new());

        let events = collect(&relay, command("일정 짜줘", Some(trip_id))).await;
        assert_eq!(events.last(), Some(&ChatEvent::Done));

        let rows = store
            .select(
                MESSAGES_TABLE,
                &Filter::new().eq("role", "assistant"),
                None,
            )
            .await
            .unwrap();
        assert_eq!(rows[0]["message_type"], "text");
        assert!(rows[0].get("metadata").is_none());
    }

    #[tokio::test]
    async fn midstream_failure_emits_error_and_skips_persistence() {
        let trip_id = Uuid::new_v4();
        let provider = MockGenerationProvider::new()
            .with_midstream_error(["시작했는데"], GenerationError::unavailable("overloaded"));
        let (relay, store) = relay_with(provider, InMemoryRowStore::new());

        let events = collect(&relay, command("여행 짜줘", Some(trip_id))).await;

        assert_eq!(events[0], ChatEvent::text("시작했는데"));
        assert!(matches!(events[1], ChatEvent::Error { .. }));
        assert!(!events.contains(&ChatEvent::Done));

        // Only the inbound message made it to the store.
        let rows = store
            .select(MESSAGES_TABLE, &Filter::new(), None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["role"], "user");
    }

    #[tokio::test]
    async fn failing_store_does_not_abort_the_turn() {
        let trip_id = Uuid::new_v4();
        let provider = MockGenerationProvider::new().with_fragments(["그래도 갑니다"]);
        let relay = ChatRelay::new(Some(Arc::new(provider)), Some(Arc::new(FailingStore)));

        let events = collect(&relay, command("여행 짜줘", Some(trip_id))).await;

        // Inbound insert failed and streaming still ran to completion;
        // the outbound insert failure arrives in-band after done.
        assert_eq!(events[0], ChatEvent::text("그래도 갑니다"));
        assert_eq!(events[1], ChatEvent::Done);
        assert!(matches!(events[2], ChatEvent::Error { .. }));
    }

    #[tokio::test]
    async fn history_roles_map_to_provider_roles() {
        let provider = MockGenerationProvider::new().with_fragments(["ok"]);
        let relay = ChatRelay::new(Some(Arc::new(provider.clone())), None);

        let command = ChatCommand {
            message: "다음은?".to_string(),
            history: vec![
                HistoryEntry {
                    role: "user".to_string(),
                    content: "부산 여행 짜줘".to_string(),
                },
                HistoryEntry {
                    role: "assistant".to_string(),
                    content: "좋아요!".to_string(),
                },
                HistoryEntry {
                    role: "system".to_string(),
                    content: "ignored role tag".to_string(),
                },
            ],
            trip_id: None,
        };

        let _ = relay.handle(command).await.unwrap().collect::<Vec<_>>().await;

        let calls = provider.chat_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].history[0], ChatMessage::user("부산 여행 짜줘"));
        assert_eq!(calls[0].history[1], ChatMessage::assistant("좋아요!"));
        // Unknown roles fold into the user role.
        assert_eq!(calls[0].history[2], ChatMessage::user("ignored role tag"));
        assert_eq!(calls[0].system_instruction, SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn turn_without_trip_id_writes_nothing() {
        let provider = MockGenerationProvider::new().with_fragments(["답변"]);
        let (relay, store) = relay_with(provider, InMemoryRowStore::new());

        let events = collect(&relay, command("여행 짜줘", None)).await;

        assert_eq!(events.last(), Some(&ChatEvent::Done));
        assert_eq!(store.total_rows(), 0);
    }

    #[tokio::test]
    async fn event_json_matches_wire_format() {
        assert_eq!(
            ChatEvent::text("안녕").to_json(),
            "{\"type\":\"text\",\"content\":\"안녕\"}"
        );
        assert_eq!(ChatEvent::Done.to_json(), "{\"type\":\"done\"}");
        assert_eq!(
            ChatEvent::error("boom").to_json(),
            "{\"type\":\"error\",\"content\":\"boom\"}"
        );
    }

    /// Store whose writes always fail, for the best-effort paths.
    struct FailingStore;

    #[async_trait::async_trait]
    impl RowStore for FailingStore {
        async fn select(
            &self,
            _table: &str,
            _filter: &Filter,
            _order: Option<&Order>,
        ) -> Result<Vec<serde_json::Value>, crate::ports::StoreError> {
            Ok(Vec::new())
        }

        async fn select_one(
            &self,
            table: &str,
            _filter: &Filter,
        ) -> Result<serde_json::Value, crate::ports::StoreError> {
            Err(crate::ports::StoreError::not_found(table))
        }

        async fn insert(
            &self,
            _table: &str,
            _row: serde_json::Value,
        ) -> Result<serde_json::Value, crate::ports::StoreError> {
            Err(crate::ports::StoreError::transport("store is down"))
        }

        async fn update(
            &self,
            _table: &str,
            _filter: &Filter,
            _patch: serde_json::Value,
        ) -> Result<(), crate::ports::StoreError> {
            Err(crate::ports::StoreError::transport("store is down"))
        }

        async fn delete(
            &self,
            _table: &str,
            _filter: &Filter,
        ) -> Result<(), crate::ports::StoreError> {
            Err(crate::ports::StoreError::transport("store is down"))
        }
    }

    mod stream_concatenation_property {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Streamed text events, concatenated in order, always
            /// equal the persisted assistant content — no reordering,
            /// drops, or duplication, for any fragmentation.
            #[test]
            fn concatenation_equals_persisted_content(
                fragments in proptest::collection::vec("[가-힣a-zA-Z0-9 ]{0,12}", 0..16)
            ) {
                let runtime = tokio::runtime::Runtime::new().unwrap();
                runtime.block_on(async {
                    let trip_id = Uuid::new_v4();
                    let provider = MockGenerationProvider::new()
                        .with_fragments(fragments.clone());
                    let (relay, store) =
                        relay_with(provider, InMemoryRowStore::new());

                    let events =
                        collect(&relay, command("여행 짜줘", Some(trip_id))).await;

                    let streamed: String = events
                        .iter()
                        .filter_map(|event| match event {
                            ChatEvent::Text { content } => Some(content.as_str()),
                            _ => None,
                        })
                        .collect();

                    prop_assert_eq!(&streamed, &fragments.concat());

                    let rows = store
                        .select(
                            MESSAGES_TABLE,
                            &Filter::new().eq("role", "assistant"),
                            None,
                        )
                        .await
                        .unwrap();
                    prop_assert_eq!(
                        rows[0]["content"].as_str().unwrap(),
                        streamed.as_str()
                    );
                    Ok(())
                })?;
            }
        }
    }

    #[tokio::test]
    async fn relay_ignores_unused_trips_table() {
        // Guard against accidental cross-table writes.
        let trip_id = Uuid::new_v4();
        let provider = MockGenerationProvider::new().with_fragments(["답변"]);
        let (relay, store) = relay_with(provider, InMemoryRowStore::new());

        collect(&relay, command("여행 짜줘", Some(trip_id))).await;

        assert_eq!(store.row_count(TRIPS_TABLE), 0);
        assert_eq!(store.row_count(MESSAGES_TABLE), 2);
    }
}
