use builder_desk_database::models::{EventChangeset, EventFilter, EventRow};
use builder_desk_scheduler::{
    partition, remap_positional, Category, Event, EventStatus, Instant, Interval, Remap, Slot,
};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::allocations::{Allocation, Pending};
use crate::error::{DeskError, Stored as _};
use crate::Desk;

#[derive(Clone, Debug, Deserialize)]
pub struct NewEvent {
    #[serde(rename = "event_name")]
    pub name: String,
    #[serde(rename = "event_type")]
    pub category: Category,
    pub start_time: Instant,
    pub end_time: Instant,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Fields left out stay as they are. `"notes": null` clears the notes.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct EventPatch {
    #[serde(default, rename = "event_name")]
    pub name: Option<String>,
    #[serde(default, rename = "event_type")]
    pub category: Option<Category>,
    #[serde(default)]
    pub status: Option<EventStatus>,
    #[serde(default, deserialize_with = "present")]
    pub notes: Option<Option<String>>,
    #[serde(default)]
    pub start_time: Option<Instant>,
    #[serde(default)]
    pub end_time: Option<Instant>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Outcome of moving an event to a new window.
#[derive(Clone, Debug, Serialize)]
pub struct WindowChange {
    pub event: Event,
    /// Allocations as stored after the move.
    pub allocations: Vec<Allocation>,
    /// Allocations whose slot position does not exist in the new grid.
    pub dropped: Vec<Allocation>,
}

#[derive(Clone, Debug, Serialize)]
pub struct EventUpdate {
    pub event: Event,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub window: Option<WindowChange>,
}

pub(crate) fn event_from_row(row: EventRow) -> Result<Event, DeskError> {
    Ok(Event {
        id: row.id,
        name: row.event_name,
        category: row.event_type.parse().stored("event type")?,
        start_time: row.start_time.into(),
        end_time: row.end_time.into(),
        status: row.status.parse().stored("event status")?,
        notes: row.notes,
        created_at: row.created_at.into(),
    })
}

fn checked_name(name: &str) -> Result<String, DeskError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DeskError::invalid("event_name must not be empty"));
    }
    Ok(name.to_owned())
}

impl Desk {
    /// New events start as drafts.
    #[instrument(skip(self, new), fields(name = %new.name))]
    pub async fn create_event(&self, new: NewEvent) -> Result<Event, DeskError> {
        let name = checked_name(&new.name)?;
        let window = Interval::new(new.start_time, new.end_time)?;
        let row = self
            .store
            .insert_event(EventRow {
                id: Uuid::new_v4(),
                event_name: name,
                event_type: new.category.as_str().to_owned(),
                start_time: window.start().into(),
                end_time: window.end().into(),
                status: EventStatus::Draft.as_str().to_owned(),
                notes: new.notes,
                created_at: Instant::now().into(),
            })
            .await?;
        info!(event = %row.id, "created event");
        event_from_row(row)
    }

    pub async fn get_event(&self, id: Uuid) -> Result<Event, DeskError> {
        self.store
            .find_event(id)
            .await?
            .ok_or_else(|| DeskError::not_found("event", id))
            .and_then(event_from_row)
    }

    /// Newest first.
    pub async fn list_events(
        &self,
        category: Option<Category>,
        status: Option<EventStatus>,
    ) -> Result<Vec<Event>, DeskError> {
        let filter = EventFilter {
            event_type: category.map(|category| category.as_str().to_owned()),
            status: status.map(|status| status.as_str().to_owned()),
        };
        self.store
            .list_events(&filter)
            .await?
            .into_iter()
            .map(event_from_row)
            .collect()
    }

    /// Applies the metadata of `patch`. When it moves the start or the end,
    /// the allocations follow through [`Self::update_event_window`].
    #[instrument(skip(self, patch))]
    pub async fn update_event(&self, id: Uuid, patch: EventPatch) -> Result<EventUpdate, DeskError> {
        let name = patch.name.as_deref().map(checked_name).transpose()?;
        let current = self.get_event(id).await?;

        let window = if patch.start_time.is_some() || patch.end_time.is_some() {
            let start = patch.start_time.unwrap_or(current.start_time);
            let end = patch.end_time.unwrap_or(current.end_time);
            Some(self.update_event_window(id, start, end).await?)
        } else {
            None
        };

        let changes = EventChangeset {
            event_name: name,
            event_type: patch.category.map(|category| category.as_str().to_owned()),
            status: patch.status.map(|status| status.as_str().to_owned()),
            notes: patch.notes,
            ..EventChangeset::default()
        };
        let event = match (changes.is_empty(), &window) {
            (true, Some(window)) => window.event.clone(),
            _ => self
                .store
                .update_event(id, changes)
                .await?
                .ok_or_else(|| DeskError::not_found("event", id))
                .and_then(event_from_row)?,
        };
        Ok(EventUpdate { event, window })
    }

    /// Moves the event to `[start, end)` and carries every allocation to the
    /// slot at the same position in the new grid. Allocations past the end of
    /// the new grid are dropped and reported.
    #[instrument(skip(self))]
    pub async fn update_event_window(
        &self,
        id: Uuid,
        start: Instant,
        end: Instant,
    ) -> Result<WindowChange, DeskError> {
        let window = Interval::new(start, end)?;
        let before = self.get_event(id).await?;
        let old_slots = before.slots().stored("event window")?;
        let current = self.list_allocations(id).await?;

        let row = self
            .store
            .update_event(
                id,
                EventChangeset {
                    start_time: Some(window.start().into()),
                    end_time: Some(window.end().into()),
                    ..EventChangeset::default()
                },
            )
            .await?
            .ok_or_else(|| DeskError::not_found("event", id))?;
        let event = event_from_row(row)?;
        let new_slots = partition(window);

        let Remap { kept, dropped } =
            remap_positional(&old_slots, &new_slots, current, self.settings.tolerance);
        for allocation in &dropped {
            warn!(
                builder = %allocation.builder_id,
                slot_start = %allocation.time_slot_start,
                "no slot at this position after the window change, dropping allocation"
            );
        }
        let allocations = match self
            .replace_allocations(id, kept.iter().cloned().map(Pending::from).collect())
            .await
        {
            Ok(allocations) => allocations,
            Err(source) => {
                for allocation in &kept {
                    warn!(
                        builder = %allocation.builder_id,
                        slot_start = %allocation.time_slot_start,
                        "window moved but allocation was not saved"
                    );
                }
                return Err(DeskError::Reslot {
                    event: id,
                    unsaved: kept,
                    source: Box::new(source),
                });
            }
        };
        info!(
            slots = new_slots.len(),
            kept = allocations.len(),
            dropped = dropped.len(),
            "moved event window"
        );
        Ok(WindowChange {
            event,
            allocations,
            dropped,
        })
    }

    /// Removes the event together with its allocations and attendance.
    #[instrument(skip(self))]
    pub async fn delete_event(&self, id: Uuid) -> Result<(), DeskError> {
        if !self.store.delete_event(id).await? {
            return Err(DeskError::not_found("event", id));
        }
        info!("deleted event");
        Ok(())
    }

    pub fn partition_slots(start: Instant, end: Instant) -> Result<Vec<Slot>, DeskError> {
        Ok(partition(Interval::new(start, end)?))
    }

    pub async fn event_slots(&self, id: Uuid) -> Result<Vec<Slot>, DeskError> {
        self.get_event(id).await?.slots().stored("event window")
    }
}
