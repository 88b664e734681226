//! Pure scheduling rules: time handling, slot grids, positional remapping and
//! the member/event vocabulary. Nothing in here touches storage.

extern crate alloc;

pub mod error;
pub mod event;
pub mod group;
pub mod instant;
pub mod interval;
pub mod member;
pub mod remap;
pub mod slots;

pub use error::ScheduleError;
pub use event::{AttendanceStatus, Category, Event, EventStatus};
pub use group::{plan_group_toggle, GroupToggle};
pub use instant::{default_tolerance, same_instant, Instant, DEFAULT_TOLERANCE_MS};
pub use interval::Interval;
pub use member::{department_members, departments, validate_department, CardCode, Member, Tier};
pub use remap::{remap_positional, Remap, SlotBound};
pub use slots::{partition, position_of, Section, Slot};
