//! In-memory row store for testing.
//!
//! Honors the same filter and ordering contract as the PostgREST
//! adapter, backed by a mutex-held table map. Rows are stored as plain
//! JSON objects, exactly as they would travel over the wire.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::ports::{Direction, Filter, Order, RowStore, StoreError};

/// In-memory implementation of RowStore.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRowStore {
    tables: Arc<Mutex<HashMap<String, Vec<Value>>>>,
}

impl InMemoryRowStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of rows in a table.
    pub fn row_count(&self, table: &str) -> usize {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .map_or(0, |rows| rows.len())
    }

    /// Returns the total number of rows across all tables.
    pub fn total_rows(&self) -> usize {
        self.tables.lock().unwrap().values().map(Vec::len).sum()
    }
}

/// Returns true when a row satisfies every predicate of the filter.
fn row_matches(row: &Value, filter: &Filter) -> bool {
    filter.predicates().iter().all(|(column, value)| {
        match row.get(column) {
            Some(Value::String(s)) => s == value,
            Some(other) => other.to_string() == *value,
            None => false,
        }
    })
}

/// Compares two rows by an order column, using string comparison.
///
/// Timestamps are stored in RFC 3339 form, which sorts correctly as
/// text.
fn compare_rows(a: &Value, b: &Value, column: &str) -> std::cmp::Ordering {
    let key = |row: &Value| match row.get(column) {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    key(a).cmp(&key(b))
}

#[async_trait]
impl RowStore for InMemoryRowStore {
    async fn select(
        &self,
        table: &str,
        filter: &Filter,
        order: Option<&Order>,
    ) -> Result<Vec<Value>, StoreError> {
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<Value> = tables
            .get(table)
            .into_iter()
            .flatten()
            .filter(|row| row_matches(row, filter))
            .cloned()
            .collect();

        if let Some(order) = order {
            rows.sort_by(|a, b| {
                let ordering = compare_rows(a, b, &order.column);
                match order.direction {
                    Direction::Ascending => ordering,
                    Direction::Descending => ordering.reverse(),
                }
            });
        }

        Ok(rows)
    }

    async fn select_one(&self, table: &str, filter: &Filter) -> Result<Value, StoreError> {
        let tables = self.tables.lock().unwrap();
        tables
            .get(table)
            .into_iter()
            .flatten()
            .find(|row| row_matches(row, filter))
            .cloned()
            .ok_or_else(|| StoreError::not_found(table))
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError> {
        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(table.to_string()).or_default();

        // Mirror the id uniqueness constraint of the real store.
        if let Some(id) = row.get("id") {
            if rows.iter().any(|existing| existing.get("id") == Some(id)) {
                return Err(StoreError::conflict(table, format!("duplicate id {id}")));
            }
        }

        rows.push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &str, filter: &Filter, patch: Value) -> Result<(), StoreError> {
        let Some(patch_fields) = patch.as_object() else {
            return Err(StoreError::parse("patch must be a JSON object"));
        };

        let mut tables = self.tables.lock().unwrap();
        if let Some(rows) = tables.get_mut(table) {
            for row in rows.iter_mut().filter(|row| row_matches(row, filter)) {
                if let Some(fields) = row.as_object_mut() {
                    for (key, value) in patch_fields {
                        fields.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, table: &str, filter: &Filter) -> Result<(), StoreError> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(rows) = tables.get_mut(table) {
            rows.retain(|row| !row_matches(row, filter));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn insert_then_select_round_trips() {
        let store = InMemoryRowStore::new();
        store
            .insert("trips", json!({"id": "t1", "title": "부산"}))
            .await
            .unwrap();

        let rows = store.select("trips", &Filter::new(), None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["title"], "부산");
    }

    #[tokio::test]
    async fn select_filters_by_equality() {
        let store = InMemoryRowStore::new();
        store
            .insert("messages", json!({"id": "m1", "trip_id": "t1"}))
            .await
            .unwrap();
        store
            .insert("messages", json!({"id": "m2", "trip_id": "t2"}))
            .await
            .unwrap();

        let rows = store
            .select("messages", &Filter::new().eq("trip_id", "t1"), None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["id"], "m1");
    }

    #[tokio::test]
    async fn select_orders_rows() {
        let store = InMemoryRowStore::new();
        store
            .insert("messages", json!({"id": "m2", "created_at": "2026-08-07T10:00:01Z"}))
            .await
            .unwrap();
        store
            .insert("messages", json!({"id": "m1", "created_at": "2026-08-07T10:00:00Z"}))
            .await
            .unwrap();

        let ascending = store
            .select("messages", &Filter::new(), Some(&Order::asc("created_at")))
            .await
            .unwrap();
        assert_eq!(ascending[0]["id"], "m1");

        let descending = store
            .select("messages", &Filter::new(), Some(&Order::desc("created_at")))
            .await
            .unwrap();
        assert_eq!(descending[0]["id"], "m2");
    }

    #[tokio::test]
    async fn select_one_missing_row_is_not_found() {
        let store = InMemoryRowStore::new();
        let result = store
            .select_one("trips", &Filter::new().eq("id", "nope"))
            .await;
        assert!(matches!(result, Err(err) if err.is_not_found()));
    }

    #[tokio::test]
    async fn duplicate_id_is_a_conflict() {
        let store = InMemoryRowStore::new();
        store.insert("trips", json!({"id": "t1"})).await.unwrap();

        let result = store.insert("trips", json!({"id": "t1"})).await;
        assert!(matches!(result, Err(StoreError::Conflict { .. })));
    }

    #[tokio::test]
    async fn update_patches_matching_rows() {
        let store = InMemoryRowStore::new();
        store
            .insert("trips", json!({"id": "t1", "title": "새 여행"}))
            .await
            .unwrap();

        store
            .update(
                "trips",
                &Filter::new().eq("id", "t1"),
                json!({"title": "부산 바다 🌊"}),
            )
            .await
            .unwrap();

        let row = store
            .select_one("trips", &Filter::new().eq("id", "t1"))
            .await
            .unwrap();
        assert_eq!(row["title"], "부산 바다 🌊");
    }

    #[tokio::test]
    async fn delete_removes_matching_rows_only() {
        let store = InMemoryRowStore::new();
        store.insert("trips", json!({"id": "t1"})).await.unwrap();
        store.insert("trips", json!({"id": "t2"})).await.unwrap();

        store
            .delete("trips", &Filter::new().eq("id", "t1"))
            .await
            .unwrap();

        assert_eq!(store.row_count("trips"), 1);
        let remaining = store.select("trips", &Filter::new(), None).await.unwrap();
        assert_eq!(remaining[0]["id"], "t2");
    }

    #[tokio::test]
    async fn non_string_filter_values_match_by_rendering() {
        let store = InMemoryRowStore::new();
        store
            .insert("rows", json!({"id": "r1", "count": 3}))
            .await
            .unwrap();

        let rows = store
            .select("rows", &Filter::new().eq("count", 3), None)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }
}
