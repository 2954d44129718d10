//! Domain types for the tripmate service.
//!
//! Holds the two persisted entities (Trip, Message), the reply
//! classification that derives a message type from the assistant's
//! accumulated text, and the fixed prompt texts.

mod message;
mod prompts;
mod trip;

pub use message::{
    classify_reply, Message, MessageRole, MessageType, ITINERARY_FENCE, MESSAGES_TABLE,
    PACKING_FENCE,
};
pub use prompts::{title_prompt, SYSTEM_PROMPT};
pub use trip::{Trip, DEFAULT_TRIP_TITLE, PLACEHOLDER_USER_ID, TRIPS_TABLE};
