use thiserror::Error;

use crate::instant::Instant;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("unparsable timestamp {input:?}: {reason}")]
    UnparsableTimestamp { input: String, reason: String },
    #[error("end {end} must be after start {start}")]
    EmptyWindow { start: Instant, end: Instant },
    #[error("unknown builder type {0:?}, expected one of MEM, EC, CC, JC")]
    UnknownTier(String),
    #[error("unknown event type {0:?}, expected one of desk_setup, night, perm, gbm")]
    UnknownCategory(String),
    #[error("unknown event status {0:?}, expected one of draft, active, completed, cancelled")]
    UnknownStatus(String),
    #[error("status must be \"present\" or \"absent\", got {0:?}")]
    UnknownAttendanceStatus(String),
    #[error("invalid builder code {0:?}")]
    InvalidCardCode(String),
    #[error("builders of type {0} need a department")]
    DepartmentRequired(&'static str),
    #[error("general members cannot belong to a department")]
    DepartmentForbidden,
}
