//! Trip entity.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Table name for trips in the row store.
pub const TRIPS_TABLE: &str = "trips";

/// Title given to trips created without one.
pub const DEFAULT_TRIP_TITLE: &str = "새 여행";

/// Placeholder user id written to every trip row.
///
/// There is no authentication layer; all rows belong to this fixed id.
pub const PLACEHOLDER_USER_ID: &str = "dummy";

/// A planned trip, as persisted in the row store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    /// Unique trip id.
    pub id: Uuid,
    /// Display title; may be overwritten by the auto-title call.
    pub title: String,
    /// Destination name as entered by the user.
    pub destination: String,
    /// First day of the trip.
    pub start_date: NaiveDate,
    /// Last day of the trip.
    pub end_date: NaiveDate,
    /// When the row was created.
    pub created_at: DateTime<Utc>,
    /// When the row was last updated.
    pub updated_at: DateTime<Utc>,
    /// Owning user (always the placeholder id).
    pub user_id: String,
}

impl Trip {
    /// Creates a new trip. A missing title falls back to the default.
    pub fn new(
        title: Option<String>,
        destination: impl Into<String>,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_TRIP_TITLE.to_string()),
            destination: destination.into(),
            start_date,
            end_date,
            created_at: now,
            updated_at: now,
            user_id: PLACEHOLDER_USER_ID.to_string(),
        }
    }

    /// Serializes the trip into a row-store row.
    pub fn into_row(self) -> serde_json::Value {
        serde_json::to_value(self).expect("trip serializes to JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dates() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2026, 8, 10).unwrap(),
            NaiveDate::from_ymd_opt(2026, 8, 13).unwrap(),
        )
    }

    #[test]
    fn new_trip_uses_provided_title() {
        let (start, end) = dates();
        let trip = Trip::new(Some("부산 먹방 여행".to_string()), "부산", start, end);
        assert_eq!(trip.title, "부산 먹방 여행");
        assert_eq!(trip.user_id, PLACEHOLDER_USER_ID);
    }

    #[test]
    fn new_trip_defaults_missing_title() {
        let (start, end) = dates();
        let trip = Trip::new(None, "부산", start, end);
        assert_eq!(trip.title, DEFAULT_TRIP_TITLE);
    }

    #[test]
    fn new_trip_defaults_empty_title() {
        let (start, end) = dates();
        let trip = Trip::new(Some(String::new()), "부산", start, end);
        assert_eq!(trip.title, DEFAULT_TRIP_TITLE);
    }

    #[test]
    fn row_uses_snake_case_columns() {
        let (start, end) = dates();
        let row = Trip::new(None, "부산", start, end).into_row();
        assert!(row.get("start_date").is_some());
        assert!(row.get("end_date").is_some());
        assert!(row.get("created_at").is_some());
        assert_eq!(row["user_id"], "dummy");
        assert_eq!(row["start_date"], "2026-08-10");
    }
}
