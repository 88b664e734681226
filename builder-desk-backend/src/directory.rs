use std::collections::HashSet;

use builder_desk_database::models::BuilderRow;
use builder_desk_database::DatabaseError;
use builder_desk_scheduler::{
    department_members, departments, validate_department, CardCode, Instant, Member, Tier,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{DeskError, Stored as _};
use crate::Desk;

#[derive(Clone, Debug, Deserialize)]
pub struct NewMember {
    pub name: String,
    #[serde(rename = "type")]
    pub tier: Tier,
    /// Picked automatically when left out.
    #[serde(default)]
    pub builder_number: Option<i32>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub registration_number: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Verification {
    pub valid: bool,
    pub builder: Option<Member>,
}

fn member_from_row(row: BuilderRow) -> Result<Member, DeskError> {
    Ok(Member {
        id: row.id,
        name: row.name,
        tier: row.builder_type.parse().stored("builder type")?,
        builder_number: row.builder_number,
        department: row.department,
        email: row.email,
        registration_number: row.registration_number,
        created_at: row.created_at.into(),
    })
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

impl Desk {
    #[instrument(skip(self, new), fields(name = %new.name, tier = %new.tier))]
    pub async fn register_member(&self, new: NewMember) -> Result<Member, DeskError> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(DeskError::invalid("name must not be empty"));
        }
        let department = validate_department(new.tier, new.department.as_deref())?;
        let builder_number = match new.builder_number {
            Some(number) if number < 1 => {
                return Err(DeskError::invalid("builder_number must be positive"));
            }
            Some(number) => number,
            None => self.next_builder_number(new.tier).await?,
        };
        let code = CardCode {
            tier: Some(new.tier),
            number: builder_number,
        };

        let row = BuilderRow {
            id: Uuid::new_v4(),
            name: name.to_owned(),
            builder_number,
            builder_type: new.tier.code().to_owned(),
            department,
            email: blank_to_none(new.email),
            registration_number: blank_to_none(new.registration_number),
            created_at: Instant::now().into(),
        };
        let row = match self.store.insert_builder(row).await {
            Ok(row) => row,
            Err(DatabaseError::UniqueViolation(_)) => {
                return Err(DeskError::DuplicateBuilderNumber(code.to_string()));
            }
            Err(error) => return Err(error.into()),
        };
        info!(%code, "registered builder");
        member_from_row(row)
    }

    pub async fn get_member(&self, id: Uuid) -> Result<Member, DeskError> {
        self.store
            .find_builder(id)
            .await?
            .ok_or_else(|| DeskError::not_found("builder", id))
            .and_then(member_from_row)
    }

    /// Ordered by tier, then number.
    pub async fn list_members(&self) -> Result<Vec<Member>, DeskError> {
        let mut members = self
            .store
            .list_builders()
            .await?
            .into_iter()
            .map(member_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        members.sort_by_key(|member| (member.tier, member.builder_number));
        Ok(members)
    }

    /// One past the highest number in use for the tier, starting at 1.
    pub async fn next_builder_number(&self, tier: Tier) -> Result<i32, DeskError> {
        let highest = self.store.max_builder_number(tier.code()).await?;
        Ok(highest.map_or(1, |number| number.saturating_add(1)))
    }

    /// Looks up the builder printed as `code`. An explicit `tier` wins over
    /// the prefix of the code.
    #[instrument(skip(self))]
    pub async fn verify_card(
        &self,
        code: &str,
        tier: Option<Tier>,
    ) -> Result<Verification, DeskError> {
        let code: CardCode = code.parse()?;
        let tier = tier.or(code.tier);
        let mut matches = self
            .store
            .find_builders_by_number(tier.map(Tier::code), code.number)
            .await?;
        if matches.len() > 1 {
            return Err(DeskError::invalid(format!(
                "builder number {} exists for several types, pass the type",
                code.number
            )));
        }
        let builder = matches.pop().map(member_from_row).transpose()?;
        Ok(Verification {
            valid: builder.is_some(),
            builder,
        })
    }

    /// Departments with at least one executive or core member.
    pub async fn departments(&self) -> Result<Vec<String>, DeskError> {
        Ok(departments(&self.list_members().await?))
    }

    /// Executive members first, then core, each by number.
    pub async fn department_members(&self, department: &str) -> Result<Vec<Member>, DeskError> {
        let members = self.list_members().await?;
        Ok(department_members(&members, department)
            .into_iter()
            .cloned()
            .collect())
    }

    pub(crate) async fn require_members(&self, ids: &[Uuid]) -> Result<(), DeskError> {
        if ids.is_empty() {
            return Ok(());
        }
        let known: HashSet<Uuid> = self
            .store
            .list_builders()
            .await?
            .into_iter()
            .map(|row| row.id)
            .collect();
        match ids.iter().find(|id| !known.contains(id)) {
            Some(unknown) => Err(DeskError::not_found("builder", unknown)),
            None => Ok(()),
        }
    }
}
