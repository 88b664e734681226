use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::models::{
    AllocationRow, AttendanceRow, BuilderRow, EventChangeset, EventFilter, EventRow,
};
use crate::store::Store;

#[derive(Default)]
struct Tables {
    events: HashMap<Uuid, EventRow>,
    builders: HashMap<Uuid, BuilderRow>,
    allocations: Vec<AllocationRow>,
    attendance: Vec<AttendanceRow>,
}

impl Tables {
    fn check_references(&self, event_id: Uuid, builder_id: Uuid) -> Result<(), DatabaseError> {
        if !self.events.contains_key(&event_id) {
            return Err(DatabaseError::ForeignKeyViolation(format!(
                "event {event_id} does not exist"
            )));
        }
        if !self.builders.contains_key(&builder_id) {
            return Err(DatabaseError::ForeignKeyViolation(format!(
                "builder {builder_id} does not exist"
            )));
        }
        Ok(())
    }
}

fn slot_key_taken(event_id: Uuid, builder_id: Uuid, start: DateTime<Utc>) -> DatabaseError {
    DatabaseError::UniqueViolation(format!(
        "Key (event_id, builder_id, time_slot_start)=({event_id}, {builder_id}, {start}) already \
         exists."
    ))
}

/// Keeps every table in process memory. Enforces the same keys as the
/// PostgreSQL schema, timestamps compared exactly like a unique index would.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_event(&self, event: EventRow) -> Result<EventRow, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.events.contains_key(&event.id) {
            return Err(DatabaseError::UniqueViolation(format!(
                "Key (id)=({}) already exists.",
                event.id
            )));
        }
        tables.events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<EventRow>, DatabaseError> {
        Ok(self.tables.read().await.events.get(&id).cloned())
    }

    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<EventRow>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut events: Vec<EventRow> = tables
            .events
            .values()
            .filter(|event| {
                filter
                    .event_type
                    .as_ref()
                    .map_or(true, |event_type| &event.event_type == event_type)
                    && filter
                        .status
                        .as_ref()
                        .map_or(true, |status| &event.status == status)
            })
            .cloned()
            .collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(events)
    }

    async fn update_event(
        &self,
        id: Uuid,
        changes: EventChangeset,
    ) -> Result<Option<EventRow>, DatabaseError> {
        let mut tables = self.tables.write().await;
        Ok(tables.events.get_mut(&id).map(|row| {
            changes.apply(row);
            row.clone()
        }))
    }

    async fn delete_event(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut tables = self.tables.write().await;
        let existed = tables.events.remove(&id).is_some();
        tables.allocations.retain(|row| row.event_id != id);
        tables.attendance.retain(|row| row.event_id != id);
        Ok(existed)
    }

    async fn insert_builder(&self, builder: BuilderRow) -> Result<BuilderRow, DatabaseError> {
        let mut tables = self.tables.write().await;
        if tables.builders.values().any(|existing| {
            existing.builder_type == builder.builder_type
                && existing.builder_number == builder.builder_number
        }) {
            return Err(DatabaseError::UniqueViolation(format!(
                "Key (type, builder_number)=({}, {}) already exists.",
                builder.builder_type, builder.builder_number
            )));
        }
        tables.builders.insert(builder.id, builder.clone());
        Ok(builder)
    }

    async fn find_builder(&self, id: Uuid) -> Result<Option<BuilderRow>, DatabaseError> {
        Ok(self.tables.read().await.builders.get(&id).cloned())
    }

    async fn list_builders(&self) -> Result<Vec<BuilderRow>, DatabaseError> {
        let mut builders: Vec<BuilderRow> =
            self.tables.read().await.builders.values().cloned().collect();
        builders.sort_by(|a, b| {
            (&a.builder_type, a.builder_number).cmp(&(&b.builder_type, b.builder_number))
        });
        Ok(builders)
    }

    async fn find_builders_by_number(
        &self,
        builder_type: Option<&str>,
        builder_number: i32,
    ) -> Result<Vec<BuilderRow>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .builders
            .values()
            .filter(|builder| {
                builder.builder_number == builder_number
                    && builder_type.map_or(true, |wanted| builder.builder_type == wanted)
            })
            .cloned()
            .collect())
    }

    async fn max_builder_number(&self, builder_type: &str) -> Result<Option<i32>, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .builders
            .values()
            .filter(|builder| builder.builder_type == builder_type)
            .map(|builder| builder.builder_number)
            .max())
    }

    async fn select_allocations(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<AllocationRow>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<AllocationRow> = tables
            .allocations
            .iter()
            .filter(|row| row.event_id == event_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            (a.time_slot_start, &a.section).cmp(&(b.time_slot_start, &b.section))
        });
        Ok(rows)
    }

    async fn count_allocations(&self, event_id: Uuid) -> Result<usize, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .allocations
            .iter()
            .filter(|row| row.event_id == event_id)
            .count())
    }

    async fn insert_allocations(
        &self,
        rows: Vec<AllocationRow>,
    ) -> Result<Vec<AllocationRow>, DatabaseError> {
        let mut tables = self.tables.write().await;
        let mut taken: HashSet<(Uuid, Uuid, DateTime<Utc>)> = tables
            .allocations
            .iter()
            .map(|row| (row.event_id, row.builder_id, row.time_slot_start))
            .collect();
        for row in &rows {
            tables.check_references(row.event_id, row.builder_id)?;
            if row.time_slot_end <= row.time_slot_start {
                return Err(DatabaseError::CheckViolation(format!(
                    "allocation {} ends at {} before it starts at {}",
                    row.id, row.time_slot_end, row.time_slot_start
                )));
            }
            if !taken.insert((row.event_id, row.builder_id, row.time_slot_start)) {
                return Err(slot_key_taken(
                    row.event_id,
                    row.builder_id,
                    row.time_slot_start,
                ));
            }
        }
        tables.allocations.extend(rows.iter().cloned());
        Ok(rows)
    }

    async fn delete_allocations(&self, event_id: Uuid) -> Result<usize, DatabaseError> {
        let mut tables = self.tables.write().await;
        let before = tables.allocations.len();
        tables.allocations.retain(|row| row.event_id != event_id);
        Ok(before - tables.allocations.len())
    }

    async fn delete_allocation(
        &self,
        event_id: Uuid,
        builder_id: Uuid,
        time_slot_start: DateTime<Utc>,
    ) -> Result<usize, DatabaseError> {
        let mut tables = self.tables.write().await;
        let before = tables.allocations.len();
        tables.allocations.retain(|row| {
            !(row.event_id == event_id
                && row.builder_id == builder_id
                && row.time_slot_start == time_slot_start)
        });
        Ok(before - tables.allocations.len())
    }

    async fn select_attendance(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<AttendanceRow>, DatabaseError> {
        let tables = self.tables.read().await;
        let mut rows: Vec<AttendanceRow> = tables
            .attendance
            .iter()
            .filter(|row| row.event_id == event_id)
            .cloned()
            .collect();
        rows.sort_by_key(|row| row.time_slot_start);
        Ok(rows)
    }

    async fn upsert_attendance(&self, row: AttendanceRow) -> Result<AttendanceRow, DatabaseError> {
        let mut tables = self.tables.write().await;
        tables.check_references(row.event_id, row.builder_id)?;
        if let Some(existing) = tables.attendance.iter_mut().find(|existing| {
            existing.event_id == row.event_id
                && existing.builder_id == row.builder_id
                && existing.time_slot_start == row.time_slot_start
        }) {
            existing.status = row.status;
            existing.notes = row.notes;
            existing.marked_at = row.marked_at;
            return Ok(existing.clone());
        }
        tables.attendance.push(row.clone());
        Ok(row)
    }
}
