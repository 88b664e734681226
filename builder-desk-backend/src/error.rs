use builder_desk_database::DatabaseError;
use builder_desk_scheduler::ScheduleError;
use thiserror::Error;
use uuid::Uuid;

use crate::allocations::Allocation;

/// How a caller should react to a [`DeskError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input. Retrying the same request fails again.
    Validation,
    NotFound,
    Conflict,
    Persistence,
}

#[derive(Error, Debug)]
pub enum DeskError {
    #[error("{0}")]
    Validation(String),
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("builder {member} already holds the slot starting {slot_start}")]
    Conflict { member: Uuid, slot_start: String },
    #[error("builder number {0} is already taken")]
    DuplicateBuilderNumber(String),
    #[error("storage failed: {0}")]
    Persistence(#[from] DatabaseError),
    #[error("{remaining} allocations of event {event} survived a repeated delete")]
    Residue { event: Uuid, remaining: usize },
    #[error("stored {what} is unreadable: {source}")]
    Unreadable {
        what: &'static str,
        #[source]
        source: ScheduleError,
    },
    /// The window moved but the remapped allocations were not saved. They
    /// are handed back so the caller can save them again.
    #[error("event {event} moved but {} allocations were not saved: {source}", .unsaved.len())]
    Reslot {
        event: Uuid,
        unsaved: Vec<Allocation>,
        #[source]
        source: Box<DeskError>,
    },
}

impl DeskError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) | Self::Persistence(DatabaseError::CheckViolation(_)) => {
                ErrorKind::Validation
            }
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. }
            | Self::DuplicateBuilderNumber(_)
            | Self::Persistence(DatabaseError::UniqueViolation(_)) => ErrorKind::Conflict,
            Self::Persistence(_) | Self::Residue { .. } | Self::Unreadable { .. } => {
                ErrorKind::Persistence
            }
            Self::Reslot { source, .. } => source.kind(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<ScheduleError> for DeskError {
    fn from(error: ScheduleError) -> Self {
        Self::Validation(error.to_string())
    }
}

/// For values read back from the store, where a parse failure means bad data
/// rather than bad input.
pub(crate) trait Stored<T> {
    fn stored(self, what: &'static str) -> Result<T, DeskError>;
}

impl<T> Stored<T> for Result<T, ScheduleError> {
    fn stored(self, what: &'static str) -> Result<T, DeskError> {
        self.map_err(|source| DeskError::Unreadable { what, source })
    }
}
