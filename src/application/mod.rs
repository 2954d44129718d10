//! Application layer - request orchestration over the ports.

mod chat_relay;
mod title;

pub use chat_relay::{ChatCommand, ChatEvent, ChatRelay, HistoryEntry, RelayError};
pub use title::{TitleCommand, TitleError, TitleGenerator};
