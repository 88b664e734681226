#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use builder_desk_backend::directory::NewMember;
use builder_desk_backend::events::NewEvent;
use builder_desk_backend::{Desk, DeskSettings};
use builder_desk_database::models::{
    AllocationRow, AttendanceRow, BuilderRow, EventChangeset, EventFilter, EventRow,
};
use builder_desk_database::{DatabaseError, MemoryStore, Store};
use builder_desk_scheduler::{Category, Event, Instant, Member, Tier};
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub fn at(time: &str) -> Instant {
    Instant::parse(&format!("2024-05-01T{time}Z")).unwrap()
}

pub fn memory_desk() -> Desk {
    Desk::new(Arc::new(MemoryStore::new()), DeskSettings::default())
}

pub async fn event(desk: &Desk, start: &str, end: &str) -> Event {
    desk.create_event(NewEvent {
        name: "Open day".to_owned(),
        category: Category::DeskSetup,
        start_time: at(start),
        end_time: at(end),
        notes: None,
    })
    .await
    .unwrap()
}

pub async fn member(desk: &Desk, name: &str, tier: Tier, department: Option<&str>) -> Member {
    desk.register_member(NewMember {
        name: name.to_owned(),
        tier,
        builder_number: None,
        department: department.map(ToOwned::to_owned),
        email: None,
        registration_number: None,
    })
    .await
    .unwrap()
}

/// Wraps a [`MemoryStore`] and misbehaves on request: it can ignore a number
/// of bulk allocation deletes, and it can let another writer slip a row in
/// right before the next allocation insert.
#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    pub ignored_deletes: AtomicUsize,
    pub delete_calls: AtomicUsize,
    pub intruder: Mutex<Option<AllocationRow>>,
}

impl FaultyStore {
    pub fn ignoring_deletes(count: usize) -> Self {
        let store = Self::default();
        store.ignored_deletes.store(count, Ordering::SeqCst);
        store
    }

    pub fn sneak_in(&self, row: AllocationRow) {
        *self.intruder.lock().unwrap() = Some(row);
    }
}

#[async_trait]
impl Store for FaultyStore {
    async fn insert_event(&self, event: EventRow) -> Result<EventRow, DatabaseError> {
        self.inner.insert_event(event).await
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<EventRow>, DatabaseError> {
        self.inner.find_event(id).await
    }

    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<EventRow>, DatabaseError> {
        self.inner.list_events(filter).await
    }

    async fn update_event(
        &self,
        id: Uuid,
        changes: EventChangeset,
    ) -> Result<Option<EventRow>, DatabaseError> {
        self.inner.update_event(id, changes).await
    }

    async fn delete_event(&self, id: Uuid) -> Result<bool, DatabaseError> {
        self.inner.delete_event(id).await
    }

    async fn insert_builder(&self, builder: BuilderRow) -> Result<BuilderRow, DatabaseError> {
        self.inner.insert_builder(builder).await
    }

    async fn find_builder(&self, id: Uuid) -> Result<Option<BuilderRow>, DatabaseError> {
        self.inner.find_builder(id).await
    }

    async fn list_builders(&self) -> Result<Vec<BuilderRow>, DatabaseError> {
        self.inner.list_builders().await
    }

    async fn find_builders_by_number(
        &self,
        builder_type: Option<&str>,
        builder_number: i32,
    ) -> Result<Vec<BuilderRow>, DatabaseError> {
        self.inner
            .find_builders_by_number(builder_type, builder_number)
            .await
    }

    async fn max_builder_number(&self, builder_type: &str) -> Result<Option<i32>, DatabaseError> {
        self.inner.max_builder_number(builder_type).await
    }

    async fn select_allocations(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<AllocationRow>, DatabaseError> {
        self.inner.select_allocations(event_id).await
    }

    async fn count_allocations(&self, event_id: Uuid) -> Result<usize, DatabaseError> {
        self.inner.count_allocations(event_id).await
    }

    async fn insert_allocations(
        &self,
        rows: Vec<AllocationRow>,
    ) -> Result<Vec<AllocationRow>, DatabaseError> {
        let intruder = self.intruder.lock().unwrap().take();
        if let Some(intruder) = intruder {
            self.inner.insert_allocations(vec![intruder]).await?;
        }
        self.inner.insert_allocations(rows).await
    }

    async fn delete_allocations(&self, event_id: Uuid) -> Result<usize, DatabaseError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let ignored = self
            .ignored_deletes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if ignored {
            return Ok(0);
        }
        self.inner.delete_allocations(event_id).await
    }

    async fn delete_allocation(
        &self,
        event_id: Uuid,
        builder_id: Uuid,
        time_slot_start: DateTime<Utc>,
    ) -> Result<usize, DatabaseError> {
        self.inner
            .delete_allocation(event_id, builder_id, time_slot_start)
            .await
    }

    async fn select_attendance(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<AttendanceRow>, DatabaseError> {
        self.inner.select_attendance(event_id).await
    }

    async fn upsert_attendance(&self, row: AttendanceRow) -> Result<AttendanceRow, DatabaseError> {
        self.inner.upsert_attendance(row).await
    }
}
