use builder_desk_database::models::AttendanceRow;
use builder_desk_scheduler::{AttendanceStatus, Instant};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::error::{DeskError, Stored as _};
use crate::Desk;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AttendanceRecord {
    pub id: Uuid,
    pub event_id: Uuid,
    pub builder_id: Uuid,
    pub time_slot_start: Instant,
    pub status: AttendanceStatus,
    pub notes: Option<String>,
    pub marked_at: Instant,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = DeskError;

    fn try_from(row: AttendanceRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            event_id: row.event_id,
            builder_id: row.builder_id,
            time_slot_start: row.time_slot_start.into(),
            status: row.status.parse().stored("attendance status")?,
            notes: row.notes,
            marked_at: row.marked_at.into(),
        })
    }
}

/// One entry of a batch mark. Validated per entry so that a bad entry only
/// fails itself.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AttendanceInput {
    #[serde(default)]
    pub builder_id: Option<Uuid>,
    #[serde(default)]
    pub time_slot_start: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

struct Mark {
    builder_id: Uuid,
    slot_start: Instant,
    status: AttendanceStatus,
    notes: Option<String>,
}

impl TryFrom<AttendanceInput> for Mark {
    type Error = DeskError;

    fn try_from(input: AttendanceInput) -> Result<Self, Self::Error> {
        let builder_id = input
            .builder_id
            .ok_or_else(|| DeskError::invalid("builder_id is required"))?;
        let slot_start = input
            .time_slot_start
            .ok_or_else(|| DeskError::invalid("time_slot_start is required"))?;
        let status = input
            .status
            .ok_or_else(|| DeskError::invalid("status is required"))?;
        Ok(Self {
            builder_id,
            slot_start: Instant::parse(&slot_start)?,
            status: status.parse()?,
            notes: input.notes,
        })
    }
}

impl Desk {
    /// Ordered by slot start.
    pub async fn list_attendance(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<AttendanceRecord>, DeskError> {
        self.store
            .select_attendance(event_id)
            .await?
            .into_iter()
            .map(AttendanceRecord::try_from)
            .collect()
    }

    /// Records `status` for the builder at the slot. A record within the
    /// tolerance of `slot_start` is updated in place and keeps its stored
    /// start. `notes: None` leaves existing notes alone.
    #[instrument(skip(self, notes))]
    pub async fn mark_attendance(
        &self,
        event_id: Uuid,
        builder_id: Uuid,
        slot_start: Instant,
        status: AttendanceStatus,
        notes: Option<String>,
    ) -> Result<AttendanceRecord, DeskError> {
        self.get_event(event_id).await?;
        self.mark(
            event_id,
            Mark {
                builder_id,
                slot_start,
                status,
                notes,
            },
        )
        .await
    }

    /// Marks every entry on its own. The outer error covers the event only,
    /// the outcome of each entry is returned in input order.
    #[instrument(skip(self, inputs), fields(inputs = inputs.len()))]
    pub async fn batch_mark_attendance(
        &self,
        event_id: Uuid,
        inputs: Vec<AttendanceInput>,
    ) -> Result<Vec<Result<AttendanceRecord, DeskError>>, DeskError> {
        self.get_event(event_id).await?;
        let mut outcomes = Vec::with_capacity(inputs.len());
        for (index, input) in inputs.into_iter().enumerate() {
            let outcome = match Mark::try_from(input) {
                Ok(mark) => self.mark(event_id, mark).await,
                Err(error) => Err(error),
            };
            if let Err(error) = &outcome {
                warn!(index, %error, "attendance entry failed");
            }
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// `None` means not marked yet, which is not the same as absent.
    pub async fn attendance_status(
        &self,
        event_id: Uuid,
        builder_id: Uuid,
        slot_start: Instant,
    ) -> Result<Option<AttendanceStatus>, DeskError> {
        Ok(self
            .find_attendance(event_id, builder_id, slot_start)
            .await?
            .map(|record| record.status))
    }

    async fn find_attendance(
        &self,
        event_id: Uuid,
        builder_id: Uuid,
        slot_start: Instant,
    ) -> Result<Option<AttendanceRecord>, DeskError> {
        Ok(self
            .list_attendance(event_id)
            .await?
            .into_iter()
            .find(|record| {
                record.builder_id == builder_id
                    && record
                        .time_slot_start
                        .is_within(slot_start, self.settings.tolerance)
            }))
    }

    async fn mark(&self, event_id: Uuid, mark: Mark) -> Result<AttendanceRecord, DeskError> {
        self.get_member(mark.builder_id).await?;
        let existing = self
            .find_attendance(event_id, mark.builder_id, mark.slot_start)
            .await?;
        let (id, slot_start, notes) = match existing {
            Some(record) => (
                record.id,
                record.time_slot_start,
                mark.notes.or(record.notes),
            ),
            None => (Uuid::new_v4(), mark.slot_start, mark.notes),
        };
        let row = self
            .store
            .upsert_attendance(AttendanceRow {
                id,
                event_id,
                builder_id: mark.builder_id,
                time_slot_start: slot_start.into(),
                status: mark.status.as_str().to_owned(),
                notes,
                marked_at: Instant::now().into(),
            })
            .await?;
        info!(
            builder = %mark.builder_id,
            %slot_start,
            status = %mark.status,
            "marked attendance"
        );
        AttendanceRecord::try_from(row)
    }
}
