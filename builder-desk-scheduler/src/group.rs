use core::hash::Hash;
use std::collections::HashSet;

use itertools::Itertools;

/// What a bulk toggle of one group on one slot should do.
#[derive(Debug, PartialEq, Eq)]
pub enum GroupToggle<M> {
    /// Every member already holds the slot: take it from all of them.
    Deselect(Vec<M>),
    /// Give the slot to the members that don't hold it yet.
    Select(Vec<M>),
}

/// Decides a bulk toggle from the group and the members currently holding the
/// slot. Holders outside the group are never part of the result.
pub fn plan_group_toggle<M>(group: &[M], holders: &HashSet<M>) -> GroupToggle<M>
where
    M: Copy + Eq + Hash,
{
    let members: Vec<M> = group.iter().copied().unique().collect();
    if !members.is_empty() && members.iter().all(|member| holders.contains(member)) {
        GroupToggle::Deselect(members)
    } else {
        GroupToggle::Select(
            members
                .into_iter()
                .filter(|member| !holders.contains(member))
                .collect(),
        )
    }
}
