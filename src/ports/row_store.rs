//! Row Store Port - generic interface to the hosted table service.
//!
//! Rows travel as `serde_json::Value` objects; domain types serialize
//! themselves into rows at the call site. Operations are independent
//! and non-transactional: no cross-row atomicity is guaranteed.

use async_trait::async_trait;
use serde_json::Value;

/// Port for row-store interactions.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Returns all rows matching the filter, optionally ordered.
    async fn select(
        &self,
        table: &str,
        filter: &Filter,
        order: Option<&Order>,
    ) -> Result<Vec<Value>, StoreError>;

    /// Returns exactly one matching row; zero rows is [`StoreError::NotFound`].
    async fn select_one(&self, table: &str, filter: &Filter) -> Result<Value, StoreError>;

    /// Inserts a row and returns the created row.
    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError>;

    /// Applies a patch to all rows matching the filter.
    async fn update(&self, table: &str, filter: &Filter, patch: Value) -> Result<(), StoreError>;

    /// Deletes all rows matching the filter.
    async fn delete(&self, table: &str, filter: &Filter) -> Result<(), StoreError>;
}

/// Column equality predicates, combined with AND.
///
/// Equality is the only predicate shape this service needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    predicates: Vec<(String, String)>,
}

impl Filter {
    /// Creates an empty filter (matches every row).
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a column equality predicate.
    pub fn eq(mut self, column: impl Into<String>, value: impl ToString) -> Self {
        self.predicates.push((column.into(), value.to_string()));
        self
    }

    /// Returns the predicates as (column, value) pairs.
    pub fn predicates(&self) -> &[(String, String)] {
        &self.predicates
    }

    /// Returns true if the filter has no predicates.
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

/// Sort direction for a select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Ordering for a select: one column plus direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

impl Order {
    /// Ascending order on a column.
    pub fn asc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Ascending,
        }
    }

    /// Descending order on a column.
    pub fn desc(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            direction: Direction::Descending,
        }
    }
}

/// Row store errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// A single-row fetch matched nothing.
    #[error("row not found in '{table}'")]
    NotFound {
        /// Table that was queried.
        table: String,
    },

    /// A constraint violation rejected the write.
    #[error("constraint violation in '{table}': {message}")]
    Conflict {
        /// Table that was written.
        table: String,
        /// Violation details.
        message: String,
    },

    /// Transport-level failure reaching the store.
    #[error("store request failed: {0}")]
    Transport(String),

    /// The store rejected the query.
    #[error("store rejected query ({status}): {message}")]
    Query {
        /// HTTP status returned by the store.
        status: u16,
        /// Error details.
        message: String,
    },

    /// Failed to parse the store response.
    #[error("store response parse error: {0}")]
    Parse(String),
}

impl StoreError {
    /// Creates a not-found error for a table.
    pub fn not_found(table: impl Into<String>) -> Self {
        Self::NotFound {
            table: table.into(),
        }
    }

    /// Creates a conflict error for a table.
    pub fn conflict(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Conflict {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Creates a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Returns true for the not-found case.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
