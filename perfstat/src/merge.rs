//! Combining the per-group counter maps of one run.
//!
//! A CPU can only count a handful of events at once, so the harness runs
//! each benchmark once per counter group. The groups overlap: the broad
//! default group also reports cycles and instructions, as can the
//! specialised ones.

use std::{collections::{BTreeMap, HashSet}, fmt, str::FromStr};
use serde::{Deserialize, Serialize};
use crate::CounterMap;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum GroupId {
    #[serde(rename = "GROUP1")]
    Group1,
    #[serde(rename = "GROUP2")]
    Group2,
    #[serde(rename = "GROUP3")]
    Group3,
    #[serde(rename = "GROUP4")]
    Group4,
}

impl GroupId {
    pub const ALL: [GroupId; 4] =
        [GroupId::Group1, GroupId::Group2, GroupId::Group3, GroupId::Group4];

    pub fn as_str(&self) -> &'static str {
        match self {
            GroupId::Group1 => "GROUP1",
            GroupId::Group2 => "GROUP2",
            GroupId::Group3 => "GROUP3",
            GroupId::Group4 => "GROUP4",
        }
    }
}

impl FromStr for GroupId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GroupId::ALL.iter()
            .find(|g| g.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown counter group {}", s))
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-group counters of one run.
pub type GroupCounters = BTreeMap<GroupId, CounterMap>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MergePolicy {
    /// Claim order: the first group reporting an event provides its value.
    pub group_order: Vec<GroupId>,
    /// Group whose values always win for `core_events`.
    pub core_group: GroupId,
    pub core_events: Vec<String>,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            group_order: GroupId::ALL.to_vec(),
            core_group: GroupId::Group1,
            core_events: ["cycles:u", "cycles", "instructions:u", "instructions"]
                .iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl MergePolicy {
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for group in &self.group_order {
            if !seen.insert(group) {
                return Err(format!(
                    "Invalid merge policy: {} listed twice in group_order.", group
                ));
            }
        }
        if self.group_order.is_empty() {
            return Err("Invalid merge policy: group_order is empty.".to_string());
        }
        Ok(())
    }
}

/// Merges the groups of one run into a single counter map. An empty result
/// means the run produced no usable counters.
pub fn merge_groups(groups: &GroupCounters, policy: &MergePolicy) -> CounterMap {
    let mut merged = CounterMap::new();

    for group in &policy.group_order {
        if let Some(counters) = groups.get(group) {
            for (event, count) in counters {
                merged.entry(event.clone()).or_insert(*count);
            }
        }
    }

    // Applied last and only when the core group ran; otherwise the claim
    // above stands.
    if let Some(core) = groups.get(&policy.core_group) {
        for event in &policy.core_events {
            if let Some(count) = core.get(event) {
                merged.insert(event.clone(), *count);
            }
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counters(entries: &[(&str, u64)]) -> CounterMap {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_first_group_claims() {
        let groups: GroupCounters = [
            (GroupId::Group2, counters(&[("LLC-stores:u", 2)])),
            (GroupId::Group3, counters(&[("LLC-stores:u", 3), ("branch-misses:u", 9)])),
        ].into_iter().collect();

        let merged = merge_groups(&groups, &MergePolicy::default());
        assert_eq!(merged["LLC-stores:u"], 2);
        assert_eq!(merged["branch-misses:u"], 9);
    }

    #[test]
    fn test_core_group_forced() {
        let groups: GroupCounters = [
            (GroupId::Group1, counters(&[("cycles:u", 100)])),
            (GroupId::Group2, counters(&[("cycles:u", 555), ("instructions:u", 7)])),
        ].into_iter().collect();

        // Claim order that lets GROUP2 see cycles first.
        let policy = MergePolicy {
            group_order: vec![GroupId::Group2, GroupId::Group1],
            ..MergePolicy::default()
        };
        let merged = merge_groups(&groups, &policy);
        assert_eq!(merged["cycles:u"], 100);
        // GROUP1 has no instructions, so GROUP2's claim stands.
        assert_eq!(merged["instructions:u"], 7);
    }

    #[test]
    fn test_missing_core_group_keeps_claim() {
        let groups: GroupCounters = [
            (GroupId::Group2, counters(&[("cycles:u", 555)])),
        ].into_iter().collect();
        let merged = merge_groups(&groups, &MergePolicy::default());
        assert_eq!(merged["cycles:u"], 555);
    }

    #[test]
    fn test_no_groups_is_empty() {
        assert!(merge_groups(&GroupCounters::new(), &MergePolicy::default()).is_empty());
    }

    #[test]
    fn test_group_parse() {
        assert_eq!("GROUP4".parse::<GroupId>(), Ok(GroupId::Group4));
        assert!("GROUP0".parse::<GroupId>().is_err());
    }

    #[test]
    fn test_duplicate_group_rejected() {
        let policy = MergePolicy {
            group_order: vec![GroupId::Group1, GroupId::Group1],
            ..MergePolicy::default()
        };
        assert!(policy.validate().is_err());
        assert!(MergePolicy::default().validate().is_ok());
    }
}
