//! Row store adapters.

mod in_memory;
mod postgrest;

pub use in_memory::InMemoryRowStore;
pub use postgrest::{PostgrestConfig, PostgrestStore};
