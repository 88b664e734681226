//! The narrow persistence contract the scheduling core talks to.
//!
//! Every method is atomic on its own. Nothing here promises atomicity across
//! calls, so callers re-check state where it matters.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::models::{
    AllocationRow, AttendanceRow, BuilderRow, EventChangeset, EventFilter, EventRow,
};

#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_event(&self, event: EventRow) -> Result<EventRow, DatabaseError>;

    async fn find_event(&self, id: Uuid) -> Result<Option<EventRow>, DatabaseError>;

    /// Newest first.
    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<EventRow>, DatabaseError>;

    async fn update_event(
        &self,
        id: Uuid,
        changes: EventChangeset,
    ) -> Result<Option<EventRow>, DatabaseError>;

    /// Also removes the event's allocations and attendance records.
    async fn delete_event(&self, id: Uuid) -> Result<bool, DatabaseError>;

    /// Fails with [`DatabaseError::UniqueViolation`] if the type and number are
    /// taken.
    async fn insert_builder(&self, builder: BuilderRow) -> Result<BuilderRow, DatabaseError>;

    async fn find_builder(&self, id: Uuid) -> Result<Option<BuilderRow>, DatabaseError>;

    /// Ordered by type, then number.
    async fn list_builders(&self) -> Result<Vec<BuilderRow>, DatabaseError>;

    async fn find_builders_by_number(
        &self,
        builder_type: Option<&str>,
        builder_number: i32,
    ) -> Result<Vec<BuilderRow>, DatabaseError>;

    async fn max_builder_number(&self, builder_type: &str) -> Result<Option<i32>, DatabaseError>;

    /// Ordered by slot start, then section.
    async fn select_allocations(&self, event_id: Uuid)
        -> Result<Vec<AllocationRow>, DatabaseError>;

    async fn count_allocations(&self, event_id: Uuid) -> Result<usize, DatabaseError>;

    /// All rows or none. A row colliding on `(event_id, builder_id,
    /// time_slot_start)` fails the whole call with
    /// [`DatabaseError::UniqueViolation`].
    async fn insert_allocations(
        &self,
        rows: Vec<AllocationRow>,
    ) -> Result<Vec<AllocationRow>, DatabaseError>;

    async fn delete_allocations(&self, event_id: Uuid) -> Result<usize, DatabaseError>;

    async fn delete_allocation(
        &self,
        event_id: Uuid,
        builder_id: Uuid,
        time_slot_start: DateTime<Utc>,
    ) -> Result<usize, DatabaseError>;

    /// Ordered by slot start.
    async fn select_attendance(&self, event_id: Uuid)
        -> Result<Vec<AttendanceRow>, DatabaseError>;

    /// Inserts, or on a `(event_id, builder_id, time_slot_start)` conflict
    /// replaces status, notes and `marked_at` of the existing row.
    async fn upsert_attendance(&self, row: AttendanceRow) -> Result<AttendanceRow, DatabaseError>;
}
