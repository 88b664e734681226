use std::collections::{BTreeMap, HashMap};

use builder_desk_scheduler::{position_of, AttendanceStatus, Event, Member, Slot};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::allocations::Allocation;
use crate::attendance::AttendanceRecord;
use crate::error::{DeskError, Stored as _};
use crate::Desk;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub builder_id: Uuid,
    pub name: Option<String>,
    pub code: Option<String>,
    /// Whether the builder was scheduled for the slot. Unscheduled builders
    /// only show up here when someone marked them anyway.
    pub allocated: bool,
    pub status: Option<AttendanceStatus>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SlotReport {
    pub slot: Slot,
    pub name: String,
    pub entries: Vec<ReportEntry>,
    pub present: usize,
    pub absent: usize,
    pub unmarked: usize,
}

#[derive(Clone, Debug, Serialize)]
pub struct AttendanceReport {
    pub event: Event,
    pub slots: Vec<SlotReport>,
    /// Allocations whose start matches no slot of the current grid.
    pub unslotted: Vec<Allocation>,
}

#[derive(Default)]
struct Cell {
    allocated: bool,
    status: Option<AttendanceStatus>,
}

fn entry(builder_id: Uuid, cell: Cell, members: &HashMap<Uuid, Member>) -> ReportEntry {
    let member = members.get(&builder_id);
    ReportEntry {
        builder_id,
        name: member.map(|member| member.name.clone()),
        code: member.map(|member| member.card_code().to_string()),
        allocated: cell.allocated,
        status: cell.status,
    }
}

impl Desk {
    /// Who was scheduled for each slot of the event and whether they showed
    /// up.
    #[instrument(skip(self))]
    pub async fn attendance_report(&self, event_id: Uuid) -> Result<AttendanceReport, DeskError> {
        let event = self.get_event(event_id).await?;
        let slots = event.slots().stored("event window")?;
        let allocations = self.list_allocations(event_id).await?;
        let attendance = self.list_attendance(event_id).await?;
        let members: HashMap<Uuid, Member> = self
            .list_members()
            .await?
            .into_iter()
            .map(|member| (member.id, member))
            .collect();
        let tolerance = self.settings.tolerance;

        // slot position -> builder -> cell, builders in a stable order
        let mut cells: Vec<BTreeMap<Uuid, Cell>> =
            slots.iter().map(|_| BTreeMap::new()).collect();
        let mut unslotted = Vec::new();
        for allocation in allocations {
            match position_of(&slots, allocation.time_slot_start, tolerance) {
                Some(position) => {
                    cells[position].entry(allocation.builder_id).or_default().allocated = true;
                }
                None => unslotted.push(allocation),
            }
        }
        for AttendanceRecord {
            builder_id,
            time_slot_start,
            status,
            ..
        } in attendance
        {
            if let Some(position) = position_of(&slots, time_slot_start, tolerance) {
                cells[position].entry(builder_id).or_default().status = Some(status);
            }
        }

        let slots = slots
            .into_iter()
            .zip(cells)
            .map(|(slot, cells)| {
                let entries: Vec<ReportEntry> = cells
                    .into_iter()
                    .map(|(builder_id, cell)| entry(builder_id, cell, &members))
                    .collect();
                let count = |status| {
                    entries
                        .iter()
                        .filter(|entry| entry.status == Some(status))
                        .count()
                };
                SlotReport {
                    name: slot.display_name().into_owned(),
                    present: count(AttendanceStatus::Present),
                    absent: count(AttendanceStatus::Absent),
                    unmarked: entries.iter().filter(|entry| entry.status.is_none()).count(),
                    entries,
                    slot,
                }
            })
            .collect();

        Ok(AttendanceReport {
            event,
            slots,
            unslotted,
        })
    }
}
