//! Ports - interfaces between the application core and external services.

mod generation;
mod row_store;

pub use generation::{
    ChatMessage, ChatRole, FragmentStream, GenerationError, GenerationProvider,
};
pub use row_store::{Direction, Filter, Order, RowStore, StoreError};
