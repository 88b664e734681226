use chrono::Duration;
use serde::Serialize;

use crate::error::ScheduleError;
use crate::instant::Instant;

/// Half-open `[start, end)`, never empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct Interval {
    start: Instant,
    end: Instant,
}

impl Interval {
    pub fn new(start: Instant, end: Instant) -> Result<Self, ScheduleError> {
        if end <= start {
            return Err(ScheduleError::EmptyWindow { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, ScheduleError> {
        Self::new(Instant::parse(start)?, Instant::parse(end)?)
    }

    #[must_use]
    pub const fn start(self) -> Instant {
        self.start
    }

    #[must_use]
    pub const fn end(self) -> Instant {
        self.end
    }

    #[must_use]
    pub fn duration(self) -> Duration {
        self.end - self.start
    }

    #[must_use]
    pub fn contains(self, instant: Instant) -> bool {
        self.start <= instant && instant < self.end
    }

    /// True if the shared part of both intervals is longer than `tolerance`,
    /// so neighbours that touch or drift by a few milliseconds don't count.
    #[must_use]
    pub fn overlaps(self, other: Self, tolerance: Duration) -> bool {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        end > start && end - start > tolerance
    }

    /// The parts of `self` not covered by `other`, in order.
    #[must_use]
    pub fn subtract(self, other: Self) -> Vec<Self> {
        if other.end <= self.start || self.end <= other.start {
            return vec![self];
        }
        [
            (self.start, other.start.min(self.end)),
            (other.end.max(self.start), self.end),
        ]
        .into_iter()
        .filter_map(|(start, end)| Self::new(start, end).ok())
        .collect()
    }
}
