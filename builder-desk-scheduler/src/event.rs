use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ScheduleError;
use crate::instant::Instant;
use crate::interval::Interval;
use crate::slots::{partition, Slot};

macro_rules! closed_set {
    ($name:ident, $error:ident, { $($variant:ident => $label:literal),+ $(,)? }) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ScheduleError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($label => Ok(Self::$variant),)+
                    _ => Err(ScheduleError::$error(s.to_owned())),
                }
            }
        }
    };
}

closed_set!(Category, UnknownCategory, {
    DeskSetup => "desk_setup",
    NightShift => "night",
    Permanent => "perm",
    GeneralMeeting => "gbm",
});

// draft -> active -> completed, cancelled from draft or active. Callers own
// the transitions; only the value set is checked here.
closed_set!(EventStatus, UnknownStatus, {
    Draft => "draft",
    Active => "active",
    Completed => "completed",
    Cancelled => "cancelled",
});

closed_set!(AttendanceStatus, UnknownAttendanceStatus, {
    Present => "present",
    Absent => "absent",
});

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    #[serde(rename = "event_name")]
    pub name: String,
    #[serde(rename = "event_type")]
    pub category: Category,
    pub start_time: Instant,
    pub end_time: Instant,
    pub status: EventStatus,
    pub notes: Option<String>,
    pub created_at: Instant,
}

impl Event {
    pub fn window(&self) -> Result<Interval, ScheduleError> {
        Interval::new(self.start_time, self.end_time)
    }

    pub fn slots(&self) -> Result<Vec<Slot>, ScheduleError> {
        self.window().map(partition)
    }
}
