//! Appointment overlap detection.
//!
//! One predicate, used by every booking path. The intervals are
//! half-open `[start, end)`, so back-to-back appointments never
//! conflict.

use crate::shared::models::Appointment;
use crate::store::{Store, Tables};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Two half-open windows overlap iff each starts before the other ends.
pub fn overlaps(
    a_start: DateTime<Utc>,
    a_end: DateTime<Utc>,
    b_start: DateTime<Utc>,
    b_end: DateTime<Utc>,
) -> bool {
    a_start < b_end && a_end > b_start
}

/// First scheduled appointment in the calendar overlapping the window,
/// skipping `exclude` (the appointment being rescheduled, if any).
pub(crate) fn find_conflict<'a>(
    tables: &'a Tables,
    calendar_id: Uuid,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    exclude: Option<Uuid>,
) -> Option<&'a Appointment> {
    tables.scheduled_in_calendar(calendar_id).find(|a| {
        Some(a.id) != exclude && overlaps(a.start_time, a.end_time, start_time, end_time)
    })
}

pub struct ConflictDetector {
    store: Arc<Store>,
}

impl ConflictDetector {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub async fn has_conflict(
        &self,
        calendar_id: Uuid,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        exclude: Option<Uuid>,
    ) -> bool {
        let tables = self.store.read().await;
        find_conflict(&tables, calendar_id, start_time, end_time, exclude).is_some()
    }
}
