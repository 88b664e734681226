//! The builder desk service: events and their slot grids, desk allocations,
//! per-slot attendance and the builder directory, on top of any [`Store`].

pub mod allocations;
pub mod attendance;
pub mod directory;
pub mod error;
pub mod events;
pub mod report;

use std::sync::Arc;

use builder_desk_config::Config;
use builder_desk_database::Store;
use builder_desk_scheduler::default_tolerance;
use chrono::Duration;
pub use error::{DeskError, ErrorKind};

#[derive(Clone, Copy, Debug)]
pub struct DeskSettings {
    /// Rows per insert when replacing an event's allocations.
    pub batch_size: usize,
    /// How far apart two slot starts may be and still name the same slot.
    pub tolerance: Duration,
}

impl Default for DeskSettings {
    fn default() -> Self {
        Self {
            batch_size: 100,
            tolerance: default_tolerance(),
        }
    }
}

impl DeskSettings {
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            batch_size: config.allocation_batch_size,
            tolerance: Duration::milliseconds(config.slot_tolerance_ms),
        }
    }
}

/// Cheap to clone, every clone shares the store.
#[derive(Clone)]
pub struct Desk {
    store: Arc<dyn Store>,
    settings: DeskSettings,
}

impl Desk {
    #[must_use]
    pub fn new(store: Arc<dyn Store>, settings: DeskSettings) -> Self {
        Self { store, settings }
    }

    #[must_use]
    pub const fn settings(&self) -> &DeskSettings {
        &self.settings
    }
}
