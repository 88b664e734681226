use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::models::{
    AllocationRow, AttendanceRow, BuilderRow, EventChangeset, EventFilter, EventRow,
};
use crate::schema::{attendance_records, builders, event_allocations, events};
use crate::store::Store;
use crate::Pool;

// https://github.com/tokio-rs/axum/tree/main/examples/diesel-async-postgres

/// [`Store`] backed by PostgreSQL. The unique indexes and `ON DELETE CASCADE`
/// foreign keys from the migrations do the enforcing.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_event(&self, event: EventRow) -> Result<EventRow, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(diesel::insert_into(events::table)
            .values(&event)
            .returning(EventRow::as_returning())
            .get_result(&mut connection)
            .await?)
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<EventRow>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(events::table
            .find(id)
            .select(EventRow::as_select())
            .first(&mut connection)
            .await
            .optional()?)
    }

    async fn list_events(&self, filter: &EventFilter) -> Result<Vec<EventRow>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        let mut query = events::table
            .select(EventRow::as_select())
            .order(events::created_at.desc())
            .into_boxed();
        if let Some(event_type) = &filter.event_type {
            query = query.filter(events::event_type.eq(event_type.clone()));
        }
        if let Some(status) = &filter.status {
            query = query.filter(events::status.eq(status.clone()));
        }
        Ok(query.load(&mut connection).await?)
    }

    async fn update_event(
        &self,
        id: Uuid,
        changes: EventChangeset,
    ) -> Result<Option<EventRow>, DatabaseError> {
        if changes.is_empty() {
            // diesel refuses an UPDATE without columns
            return self.find_event(id).await;
        }
        let mut connection = self.pool.get().await?;
        Ok(diesel::update(events::table.find(id))
            .set(&changes)
            .returning(EventRow::as_returning())
            .get_result(&mut connection)
            .await
            .optional()?)
    }

    async fn delete_event(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let mut connection = self.pool.get().await?;
        let deleted = diesel::delete(events::table.find(id))
            .execute(&mut connection)
            .await?;
        Ok(deleted > 0)
    }

    async fn insert_builder(&self, builder: BuilderRow) -> Result<BuilderRow, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(diesel::insert_into(builders::table)
            .values(&builder)
            .returning(BuilderRow::as_returning())
            .get_result(&mut connection)
            .await?)
    }

    async fn find_builder(&self, id: Uuid) -> Result<Option<BuilderRow>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(builders::table
            .find(id)
            .select(BuilderRow::as_select())
            .first(&mut connection)
            .await
            .optional()?)
    }

    async fn list_builders(&self) -> Result<Vec<BuilderRow>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(builders::table
            .select(BuilderRow::as_select())
            .order((builders::builder_type.asc(), builders::builder_number.asc()))
            .load(&mut connection)
            .await?)
    }

    async fn find_builders_by_number(
        &self,
        builder_type: Option<&str>,
        builder_number: i32,
    ) -> Result<Vec<BuilderRow>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        let mut query = builders::table
            .select(BuilderRow::as_select())
            .filter(builders::builder_number.eq(builder_number))
            .order(builders::builder_type.asc())
            .into_boxed();
        if let Some(builder_type) = builder_type {
            query = query.filter(builders::builder_type.eq(builder_type.to_owned()));
        }
        Ok(query.load(&mut connection).await?)
    }

    async fn max_builder_number(&self, builder_type: &str) -> Result<Option<i32>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(builders::table
            .filter(builders::builder_type.eq(builder_type))
            .select(diesel::dsl::max(builders::builder_number))
            .first::<Option<i32>>(&mut connection)
            .await?)
    }

    async fn select_allocations(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<AllocationRow>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(event_allocations::table
            .filter(event_allocations::event_id.eq(event_id))
            .select(AllocationRow::as_select())
            .order((
                event_allocations::time_slot_start.asc(),
                event_allocations::section.asc(),
            ))
            .load(&mut connection)
            .await?)
    }

    async fn count_allocations(&self, event_id: Uuid) -> Result<usize, DatabaseError> {
        let mut connection = self.pool.get().await?;
        let count: i64 = event_allocations::table
            .filter(event_allocations::event_id.eq(event_id))
            .count()
            .get_result(&mut connection)
            .await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    async fn insert_allocations(
        &self,
        rows: Vec<AllocationRow>,
    ) -> Result<Vec<AllocationRow>, DatabaseError> {
        if rows.is_empty() {
            return Ok(rows);
        }
        let mut connection = self.pool.get().await?;
        Ok(diesel::insert_into(event_allocations::table)
            .values(&rows)
            .returning(AllocationRow::as_returning())
            .get_results(&mut connection)
            .await?)
    }

    async fn delete_allocations(&self, event_id: Uuid) -> Result<usize, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(diesel::delete(
            event_allocations::table.filter(event_allocations::event_id.eq(event_id)),
        )
        .execute(&mut connection)
        .await?)
    }

    async fn delete_allocation(
        &self,
        event_id: Uuid,
        builder_id: Uuid,
        time_slot_start: DateTime<Utc>,
    ) -> Result<usize, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(diesel::delete(
            event_allocations::table
                .filter(event_allocations::event_id.eq(event_id))
                .filter(event_allocations::builder_id.eq(builder_id))
                .filter(event_allocations::time_slot_start.eq(time_slot_start)),
        )
        .execute(&mut connection)
        .await?)
    }

    async fn select_attendance(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<AttendanceRow>, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(attendance_records::table
            .filter(attendance_records::event_id.eq(event_id))
            .select(AttendanceRow::as_select())
            .order(attendance_records::time_slot_start.asc())
            .load(&mut connection)
            .await?)
    }

    async fn upsert_attendance(&self, row: AttendanceRow) -> Result<AttendanceRow, DatabaseError> {
        let mut connection = self.pool.get().await?;
        Ok(diesel::insert_into(attendance_records::table)
            .values(&row)
            .on_conflict((
                attendance_records::event_id,
                attendance_records::builder_id,
                attendance_records::time_slot_start,
            ))
            .do_update()
            .set((
                attendance_records::status.eq(excluded(attendance_records::status)),
                attendance_records::notes.eq(excluded(attendance_records::notes)),
                attendance_records::marked_at.eq(excluded(attendance_records::marked_at)),
            ))
            .returning(AttendanceRow::as_returning())
            .get_result(&mut connection)
            .await?)
    }
}
