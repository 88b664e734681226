use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::schema::{attendance_records, builders, event_allocations, events};

#[derive(Queryable, Selectable, Insertable, Clone, Debug, PartialEq, Eq)]
#[diesel(table_name = events)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct EventRow {
    pub id: Uuid,
    pub event_name: String,
    pub event_type: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// `None` leaves a column alone; `notes: Some(None)` clears the notes.
#[derive(AsChangeset, Clone, Debug, Default)]
#[diesel(table_name = events)]
pub struct EventChangeset {
    pub event_name: Option<String>,
    pub event_type: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: Option<String>,
    pub notes: Option<Option<String>>,
}

impl EventChangeset {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.event_name.is_none()
            && self.event_type.is_none()
            && self.start_time.is_none()
            && self.end_time.is_none()
            && self.status.is_none()
            && self.notes.is_none()
    }

    pub fn apply(self, row: &mut EventRow) {
        if let Some(event_name) = self.event_name {
            row.event_name = event_name;
        }
        if let Some(event_type) = self.event_type {
            row.event_type = event_type;
        }
        if let Some(start_time) = self.start_time {
            row.start_time = start_time;
        }
        if let Some(end_time) = self.end_time {
            row.end_time = end_time;
        }
        if let Some(status) = self.status {
            row.status = status;
        }
        if let Some(notes) = self.notes {
            row.notes = notes;
        }
    }
}

#[derive(Default, Clone, Debug)]
pub struct EventFilter {
    pub event_type: Option<String>,
    pub status: Option<String>,
}

#[derive(Queryable, Selectable, Insertable, Clone, Debug, PartialEq, Eq)]
#[diesel(table_name = builders)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct BuilderRow {
    pub id: Uuid,
    pub name: String,
    pub builder_number: i32,
    pub builder_type: String,
    pub department: Option<String>,
    pub email: Option<String>,
    pub registration_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Insertable, Clone, Debug, PartialEq, Eq)]
#[diesel(table_name = event_allocations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AllocationRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub builder_id: Uuid,
    pub time_slot_start: DateTime<Utc>,
    pub time_slot_end: DateTime<Utc>,
    pub section: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Queryable, Selectable, Insertable, Clone, Debug, PartialEq, Eq)]
#[diesel(table_name = attendance_records)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct AttendanceRow {
    pub id: Uuid,
    pub event_id: Uuid,
    pub builder_id: Uuid,
    pub time_slot_start: DateTime<Utc>,
    pub status: String,
    pub notes: Option<String>,
    pub marked_at: DateTime<Utc>,
}
