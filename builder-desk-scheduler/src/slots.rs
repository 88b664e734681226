//! Cuts an event window into logistics and desk slots.
//!
//! Windows shorter than an hour become a single `logistics` slot. Longer ones
//! get a 30 minute `logistics_setup`, as many 30 minute `desk_{i}` slots as fit
//! before the last 30 minutes, and a `logistics_cleanup` slot covering the
//! rest. A trailing desk remainder shorter than 15 minutes is folded into
//! cleanup.

use alloc::borrow::Cow;
use core::fmt;
use core::str::FromStr;

use chrono::Duration;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::instant::Instant;
use crate::interval::Interval;

pub const SLOT_MINUTES: i64 = 30;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Section {
    Logistics,
    LogisticsSetup,
    LogisticsCleanup,
    Desk(u32),
    /// A label this version does not generate, kept verbatim.
    Other(String),
}

impl Section {
    #[must_use]
    pub fn label(&self) -> Cow<'_, str> {
        match self {
            Self::Logistics => Cow::Borrowed("logistics"),
            Self::LogisticsSetup => Cow::Borrowed("logistics_setup"),
            Self::LogisticsCleanup => Cow::Borrowed("logistics_cleanup"),
            Self::Desk(index) => Cow::Owned(format!("desk_{index}")),
            Self::Other(label) => Cow::Borrowed(label),
        }
    }

    #[must_use]
    pub fn display_name(&self) -> Cow<'_, str> {
        match self {
            Self::Logistics => Cow::Borrowed("Logistics"),
            Self::LogisticsSetup => Cow::Borrowed("Logistics (Setup)"),
            Self::LogisticsCleanup => Cow::Borrowed("Logistics (Cleanup)"),
            Self::Desk(index) => Cow::Owned(format!("Desk Slot {index}")),
            Self::Other(label) => Cow::Borrowed(label),
        }
    }
}

impl From<&str> for Section {
    fn from(label: &str) -> Self {
        let label = label.trim();
        match label {
            "logistics" => Self::Logistics,
            "logistics_setup" => Self::LogisticsSetup,
            "logistics_cleanup" => Self::LogisticsCleanup,
            _ => label
                .strip_prefix("desk_")
                .and_then(|index| index.parse().ok())
                .map_or_else(|| Self::Other(label.to_owned()), Self::Desk),
        }
    }
}

impl FromStr for Section {
    type Err = core::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl Serialize for Section {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

impl<'de> Deserialize<'de> for Section {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(|label| Self::from(label.as_str()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub start: Instant,
    pub end: Instant,
    pub section: Section,
}

impl Slot {
    #[must_use]
    pub const fn new(start: Instant, end: Instant, section: Section) -> Self {
        Self {
            start,
            end,
            section,
        }
    }

    #[must_use]
    pub fn display_name(&self) -> Cow<'_, str> {
        self.section.display_name()
    }
}

#[must_use]
pub fn slot_length() -> Duration {
    Duration::minutes(SLOT_MINUTES)
}

#[must_use]
pub fn partition(window: Interval) -> Vec<Slot> {
    let slot = slot_length();
    let (start, end) = (window.start(), window.end());

    if window.duration() < slot * 2 {
        return vec![Slot::new(start, end, Section::Logistics)];
    }

    let capacity = usize::try_from(window.duration().num_minutes() / SLOT_MINUTES).unwrap_or(0) + 1;
    let mut slots = Vec::with_capacity(capacity);

    let setup_end = start + slot;
    slots.push(Slot::new(start, setup_end, Section::LogisticsSetup));

    let cleanup_start = end - slot;
    let mut cursor = setup_end;
    let mut desk = 1;
    while cursor < cleanup_start {
        let desk_end = (cursor + slot).min(cleanup_start);
        if desk_end - cursor < slot / 2 {
            break;
        }
        slots.push(Slot::new(cursor, desk_end, Section::Desk(desk)));
        cursor = desk_end;
        desk += 1;
    }

    if cursor < end {
        slots.push(Slot::new(cursor, end, Section::LogisticsCleanup));
    }
    slots
}

/// Position of the slot starting at `start`, tolerance-matched.
#[must_use]
pub fn position_of(slots: &[Slot], start: Instant, tolerance: Duration) -> Option<usize> {
    slots
        .iter()
        .position(|slot| slot.start.is_within(start, tolerance))
}
