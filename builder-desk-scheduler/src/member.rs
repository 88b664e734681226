use core::fmt;
use core::str::FromStr;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ScheduleError;
use crate::instant::Instant;

/// Membership tier. The declaration order is the listing order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    #[serde(rename = "MEM")]
    General,
    #[serde(rename = "EC")]
    Executive,
    #[serde(rename = "CC")]
    Core,
    #[serde(rename = "JC")]
    Junior,
}

impl Tier {
    pub const ALL: [Self; 4] = [Self::General, Self::Executive, Self::Core, Self::Junior];

    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::General => "MEM",
            Self::Executive => "EC",
            Self::Core => "CC",
            Self::Junior => "JC",
        }
    }

    #[must_use]
    pub const fn requires_department(self) -> bool {
        !matches!(self, Self::General)
    }

    /// Tiers that department-wide allocation picks up.
    #[must_use]
    pub const fn in_department_groups(self) -> bool {
        matches!(self, Self::Executive | Self::Core)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Tier {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Self::ALL
            .into_iter()
            .find(|tier| tier.code().eq_ignore_ascii_case(code))
            .ok_or_else(|| ScheduleError::UnknownTier(s.to_owned()))
    }
}

/// Enforces "department for committee tiers, none for general members".
/// Blank departments count as missing.
pub fn validate_department(
    tier: Tier,
    department: Option<&str>,
) -> Result<Option<String>, ScheduleError> {
    let department = department.map(str::trim).filter(|value| !value.is_empty());
    match (tier.requires_department(), department) {
        (true, None) => Err(ScheduleError::DepartmentRequired(tier.code())),
        (false, Some(_)) => Err(ScheduleError::DepartmentForbidden),
        (_, department) => Ok(department.map(ToOwned::to_owned)),
    }
}

/// What is printed on a builder card, e.g. `EC7`. Bare numbers are accepted
/// for older cards that carry no tier prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CardCode {
    pub tier: Option<Tier>,
    pub number: i32,
}

impl FromStr for CardCode {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        let split = code
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(|| ScheduleError::InvalidCardCode(s.to_owned()))?;
        let (prefix, digits) = code.split_at(split);
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(ScheduleError::InvalidCardCode(s.to_owned()));
        }
        let number = digits
            .parse()
            .map_err(|_| ScheduleError::InvalidCardCode(s.to_owned()))?;
        let tier = if prefix.is_empty() {
            None
        } else {
            Some(prefix.parse()?)
        };
        Ok(Self { tier, number })
    }
}

impl fmt::Display for CardCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.tier {
            Some(tier) => write!(f, "{tier}{}", self.number),
            None => write!(f, "{}", self.number),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "type")]
    pub tier: Tier,
    pub builder_number: i32,
    pub department: Option<String>,
    pub email: Option<String>,
    pub registration_number: Option<String>,
    pub created_at: Instant,
}

impl Member {
    #[must_use]
    pub const fn card_code(&self) -> CardCode {
        CardCode {
            tier: Some(self.tier),
            number: self.builder_number,
        }
    }
}

/// Departments that have at least one member eligible for department-wide
/// allocation, sorted.
#[must_use]
pub fn departments(members: &[Member]) -> Vec<String> {
    members
        .iter()
        .filter(|member| member.tier.in_department_groups())
        .filter_map(|member| member.department.clone())
        .sorted()
        .dedup()
        .collect()
}

/// Executive members first, then core, each by builder number.
#[must_use]
pub fn department_members<'a>(members: &'a [Member], department: &str) -> Vec<&'a Member> {
    members
        .iter()
        .filter(|member| {
            member.tier.in_department_groups() && member.department.as_deref() == Some(department)
        })
        .sorted_by_key(|member| (member.tier, member.builder_number))
        .collect()
}
