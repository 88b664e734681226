use std::collections::HashSet;

use builder_desk_database::models::AllocationRow;
use builder_desk_database::DatabaseError;
use builder_desk_scheduler::{
    plan_group_toggle, GroupToggle, Instant, Interval, Section, Slot, SlotBound,
};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::DeskError;
use crate::Desk;

/// A builder placed on one slot of an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub id: Uuid,
    pub event_id: Uuid,
    pub builder_id: Uuid,
    pub time_slot_start: Instant,
    pub time_slot_end: Instant,
    pub section: Option<Section>,
    pub created_at: Instant,
}

impl From<AllocationRow> for Allocation {
    fn from(row: AllocationRow) -> Self {
        Self {
            id: row.id,
            event_id: row.event_id,
            builder_id: row.builder_id,
            time_slot_start: row.time_slot_start.into(),
            time_slot_end: row.time_slot_end.into(),
            section: row.section.map(|label| Section::from(label.as_str())),
            created_at: row.created_at.into(),
        }
    }
}

impl SlotBound for Allocation {
    fn slot_start(&self) -> Instant {
        self.time_slot_start
    }

    fn rebind(self, slot: &Slot) -> Self {
        Self {
            time_slot_start: slot.start,
            time_slot_end: slot.end,
            section: Some(slot.section.clone()),
            ..self
        }
    }
}

/// One entry of a full allocation save as sent by a client. Everything is
/// optional here so that a missing field is reported with its position.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AllocationInput {
    #[serde(default)]
    pub builder_id: Option<Uuid>,
    #[serde(default)]
    pub time_slot_start: Option<String>,
    #[serde(default)]
    pub time_slot_end: Option<String>,
    #[serde(default)]
    pub section: Option<Section>,
}

impl From<Allocation> for AllocationInput {
    fn from(allocation: Allocation) -> Self {
        Self {
            builder_id: Some(allocation.builder_id),
            time_slot_start: Some(allocation.time_slot_start.normalize()),
            time_slot_end: Some(allocation.time_slot_end.normalize()),
            section: allocation.section,
        }
    }
}

/// A validated allocation that is not stored yet.
#[derive(Clone, Debug)]
pub(crate) struct Pending {
    builder_id: Uuid,
    start: Instant,
    end: Instant,
    section: Option<Section>,
}

impl Pending {
    fn key(&self) -> (Uuid, String) {
        (self.builder_id, self.start.normalize())
    }

    fn into_row(self, event_id: Uuid, created_at: Instant) -> AllocationRow {
        AllocationRow {
            id: Uuid::new_v4(),
            event_id,
            builder_id: self.builder_id,
            time_slot_start: self.start.into(),
            time_slot_end: self.end.into(),
            section: self.section.map(|section| section.label().into_owned()),
            created_at: created_at.into(),
        }
    }

    fn for_slot(builder_id: Uuid, slot: &Slot) -> Self {
        Self {
            builder_id,
            start: slot.start,
            end: slot.end,
            section: Some(slot.section.clone()),
        }
    }
}

impl From<Allocation> for Pending {
    fn from(allocation: Allocation) -> Self {
        Self {
            builder_id: allocation.builder_id,
            start: allocation.time_slot_start,
            end: allocation.time_slot_end,
            section: allocation.section,
        }
    }
}

impl TryFrom<(usize, AllocationInput)> for Pending {
    type Error = DeskError;

    fn try_from((index, input): (usize, AllocationInput)) -> Result<Self, Self::Error> {
        let missing =
            |field: &str| DeskError::invalid(format!("allocation {index}: {field} is required"));
        let builder_id = input.builder_id.ok_or_else(|| missing("builder_id"))?;
        let start = input.time_slot_start.ok_or_else(|| missing("time_slot_start"))?;
        let end = input.time_slot_end.ok_or_else(|| missing("time_slot_end"))?;
        let (start, end) = (Instant::parse(&start), Instant::parse(&end));
        let (start, end) = start
            .and_then(|start| end.map(|end| (start, end)))
            .map_err(|error| DeskError::invalid(format!("allocation {index}: {error}")))?;
        if end <= start {
            return Err(DeskError::invalid(format!(
                "allocation {index}: time_slot_end must be after time_slot_start"
            )));
        }
        Ok(Self {
            builder_id,
            start,
            end,
            section: input.section,
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "allocation", rename_all = "snake_case")]
pub enum Toggled {
    Added(Allocation),
    Removed(Allocation),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GroupChanges {
    pub added: Vec<Allocation>,
    pub removed: Vec<Allocation>,
}

/// First occurrence of every `(builder, slot start)` wins.
fn dedup(pending: Vec<Pending>) -> Vec<Pending> {
    pending.into_iter().unique_by(Pending::key).collect()
}

impl Desk {
    /// Ordered by slot start, then section.
    pub async fn list_allocations(&self, event_id: Uuid) -> Result<Vec<Allocation>, DeskError> {
        Ok(self
            .store
            .select_allocations(event_id)
            .await?
            .into_iter()
            .map(Allocation::from)
            .collect())
    }

    /// Removes the builder from the slot if they hold it, otherwise puts
    /// them on it.
    #[instrument(skip(self, slot), fields(slot_start = %slot.start))]
    pub async fn toggle_allocation(
        &self,
        event_id: Uuid,
        builder_id: Uuid,
        slot: &Slot,
    ) -> Result<Toggled, DeskError> {
        Interval::new(slot.start, slot.end)?;
        self.get_event(event_id).await?;
        self.get_member(builder_id).await?;

        if let Some(existing) = self.find_allocation(event_id, builder_id, slot.start).await? {
            self.store
                .delete_allocation(event_id, builder_id, existing.time_slot_start.into())
                .await?;
            info!("removed allocation");
            return Ok(Toggled::Removed(existing));
        }
        let added = self.insert_allocation(event_id, builder_id, slot).await?;
        info!("added allocation");
        Ok(Toggled::Added(added))
    }

    /// Takes the slot from every member of the group if all of them hold it,
    /// otherwise gives it to those that don't. Nobody outside the group is
    /// touched.
    #[instrument(
        skip(self, members, slot),
        fields(members = members.len(), slot_start = %slot.start)
    )]
    pub async fn toggle_group_allocation(
        &self,
        event_id: Uuid,
        members: &[Uuid],
        slot: &Slot,
    ) -> Result<GroupChanges, DeskError> {
        Interval::new(slot.start, slot.end)?;
        self.get_event(event_id).await?;
        self.require_members(members).await?;

        let on_slot: Vec<Allocation> = self
            .list_allocations(event_id)
            .await?
            .into_iter()
            .filter(|allocation| {
                allocation
                    .time_slot_start
                    .is_within(slot.start, self.settings.tolerance)
            })
            .collect();
        let holders: HashSet<Uuid> = on_slot
            .iter()
            .map(|allocation| allocation.builder_id)
            .collect();

        let mut changes = GroupChanges::default();
        match plan_group_toggle(members, &holders) {
            GroupToggle::Deselect(leaving) => {
                let leaving: HashSet<Uuid> = leaving.into_iter().collect();
                for allocation in on_slot {
                    if !leaving.contains(&allocation.builder_id) {
                        continue;
                    }
                    self.store
                        .delete_allocation(
                            event_id,
                            allocation.builder_id,
                            allocation.time_slot_start.into(),
                        )
                        .await?;
                    changes.removed.push(allocation);
                }
            }
            GroupToggle::Select(joining) => {
                let rows: Vec<AllocationRow> = joining
                    .into_iter()
                    .map(|builder_id| {
                        Pending::for_slot(builder_id, slot).into_row(event_id, Instant::now())
                    })
                    .collect();
                changes.added = self.insert_rows(event_id, rows).await?;
            }
        }
        info!(
            added = changes.added.len(),
            removed = changes.removed.len(),
            "toggled group"
        );
        Ok(changes)
    }

    /// [`Self::toggle_group_allocation`] for the executive and core members
    /// of a department.
    pub async fn toggle_department_allocation(
        &self,
        event_id: Uuid,
        department: &str,
        slot: &Slot,
    ) -> Result<GroupChanges, DeskError> {
        let members: Vec<Uuid> = self
            .department_members(department)
            .await?
            .into_iter()
            .map(|member| member.id)
            .collect();
        if members.is_empty() {
            return Err(DeskError::not_found("department", department));
        }
        self.toggle_group_allocation(event_id, &members, slot).await
    }

    /// Replaces every allocation of the event with `inputs`. Nothing is
    /// written unless all inputs are valid.
    #[instrument(skip(self, inputs), fields(inputs = inputs.len()))]
    pub async fn save_allocations(
        &self,
        event_id: Uuid,
        inputs: Vec<AllocationInput>,
    ) -> Result<Vec<Allocation>, DeskError> {
        let pending = inputs
            .into_iter()
            .enumerate()
            .map(Pending::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        self.get_event(event_id).await?;
        self.replace_allocations(event_id, pending).await
    }

    pub(crate) async fn replace_allocations(
        &self,
        event_id: Uuid,
        pending: Vec<Pending>,
    ) -> Result<Vec<Allocation>, DeskError> {
        let pending = dedup(pending);
        let builders: Vec<Uuid> = pending.iter().map(|entry| entry.builder_id).collect();
        self.require_members(&builders).await?;

        self.clear_allocations(event_id).await?;

        let created_at = Instant::now();
        let mut saved = Vec::with_capacity(pending.len());
        for (batch, chunk) in pending.chunks(self.settings.batch_size.max(1)).enumerate() {
            let rows: Vec<AllocationRow> = chunk
                .iter()
                .unique_by(|entry| entry.key())
                .cloned()
                .map(|entry| entry.into_row(event_id, created_at))
                .collect();
            debug!(batch, rows = rows.len(), "inserting allocations");
            saved.extend(self.insert_rows(event_id, rows).await?);
        }
        info!(saved = saved.len(), "replaced allocations");
        Ok(saved)
    }

    /// Deletes all allocations of the event and makes sure none survived,
    /// retrying the delete once.
    async fn clear_allocations(&self, event_id: Uuid) -> Result<(), DeskError> {
        if self.store.count_allocations(event_id).await? == 0 {
            return Ok(());
        }
        let deleted = self.store.delete_allocations(event_id).await?;
        debug!(deleted, "deleted allocations");

        if self.store.count_allocations(event_id).await? == 0 {
            return Ok(());
        }
        warn!("allocations still present after delete, retrying");
        self.store.delete_allocations(event_id).await?;
        match self.store.count_allocations(event_id).await? {
            0 => Ok(()),
            remaining => Err(DeskError::Residue {
                event: event_id,
                remaining,
            }),
        }
    }

    async fn find_allocation(
        &self,
        event_id: Uuid,
        builder_id: Uuid,
        start: Instant,
    ) -> Result<Option<Allocation>, DeskError> {
        Ok(self
            .list_allocations(event_id)
            .await?
            .into_iter()
            .find(|allocation| {
                allocation.builder_id == builder_id
                    && allocation.time_slot_start.is_within(start, self.settings.tolerance)
            }))
    }

    /// Another toggle may have placed the builder since the caller looked,
    /// so look again right before writing.
    async fn insert_allocation(
        &self,
        event_id: Uuid,
        builder_id: Uuid,
        slot: &Slot,
    ) -> Result<Allocation, DeskError> {
        if let Some(existing) = self.find_allocation(event_id, builder_id, slot.start).await? {
            debug!("allocation appeared concurrently, keeping it");
            return Ok(existing);
        }
        let row = Pending::for_slot(builder_id, slot).into_row(event_id, Instant::now());
        self.insert_rows(event_id, vec![row])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| DeskError::not_found("allocation", builder_id))
    }

    /// Inserts all rows or none. A unique violation is reported as a
    /// conflict naming the row that collided.
    async fn insert_rows(
        &self,
        event_id: Uuid,
        rows: Vec<AllocationRow>,
    ) -> Result<Vec<Allocation>, DeskError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        match self.store.insert_allocations(rows.clone()).await {
            Ok(inserted) => Ok(inserted.into_iter().map(Allocation::from).collect()),
            Err(DatabaseError::UniqueViolation(detail)) => {
                Err(self.collision(event_id, &rows, detail).await)
            }
            Err(error) => Err(error.into()),
        }
    }

    async fn collision(&self, event_id: Uuid, rows: &[AllocationRow], detail: String) -> DeskError {
        let existing = match self.store.select_allocations(event_id).await {
            Ok(existing) => existing,
            Err(error) => return error.into(),
        };
        let colliding = rows.iter().find(|row| {
            existing.iter().any(|stored| {
                stored.builder_id == row.builder_id && stored.time_slot_start == row.time_slot_start
            })
        });
        match colliding {
            Some(row) => {
                let slot_start = Instant::from(row.time_slot_start).normalize();
                warn!(builder = %row.builder_id, %slot_start, "allocation collided");
                DeskError::Conflict {
                    member: row.builder_id,
                    slot_start,
                }
            }
            None => DeskError::Persistence(DatabaseError::UniqueViolation(detail)),
        }
    }
}
