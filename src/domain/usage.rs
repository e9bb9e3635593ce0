//! Usage Aggregator
//!
//! Splits a collection's variables into used and unused, given the ids found
//! by a usage-mode scan and the forced-used naming rule.

use serde::{Deserialize, Serialize};

use crate::domain::document::Node;
use crate::domain::taxonomy::Taxonomy;
use crate::domain::variable::Variable;
use crate::domain::walker::{collect_used_ids, UsedIdSet};

/// Name fragment marking variables that are always treated as used.
pub const FONT_FAMILY: &str = "font-family";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsagePolicy {
    /// Case-insensitive substrings; a matching name is always used.
    pub forced_used: Vec<String>,
    pub taxonomy: Taxonomy,
}

impl Default for UsagePolicy {
    fn default() -> Self {
        Self {
            forced_used: vec![FONT_FAMILY.to_string()],
            taxonomy: Taxonomy::default(),
        }
    }
}

impl UsagePolicy {
    pub fn is_forced_used(&self, name: &str) -> bool {
        let lowered = name.to_lowercase();
        self.forced_used
            .iter()
            .any(|pattern| lowered.contains(&pattern.to_lowercase()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UsageReport {
    pub collection_id: String,
    pub used: Vec<Variable>,
    pub unused: Vec<Variable>,
    /// Every collection variable name in structural order, when requested.
    pub all_sorted: Option<Vec<String>>,
}

/// Partition the variables of `collection_id` by membership in `used_ids`.
///
/// Forced-used variables are added to `used_ids` first, so the set only grows.
pub fn partition_usage(
    variables: &[Variable],
    collection_id: &str,
    mut used_ids: UsedIdSet,
    include_all: bool,
    policy: &UsagePolicy,
) -> UsageReport {
    let collection_variables: Vec<&Variable> = variables
        .iter()
        .filter(|v| v.collection_id == collection_id)
        .collect();

    for variable in &collection_variables {
        if policy.is_forced_used(&variable.name) {
            used_ids.insert(variable.id.clone());
        }
    }

    let all_sorted = include_all.then(|| {
        let names: Vec<&str> = collection_variables.iter().map(|v| v.name.as_str()).collect();
        policy.taxonomy.sort(&names)
    });

    let (used, unused): (Vec<&Variable>, Vec<&Variable>) = collection_variables
        .into_iter()
        .partition(|v| used_ids.contains(&v.id));

    UsageReport {
        collection_id: collection_id.to_string(),
        used: used.into_iter().cloned().collect(),
        unused: unused.into_iter().cloned().collect(),
        all_sorted,
    }
}

/// Scan `roots` and aggregate usage for one collection.
pub fn aggregate_usage<'a, I>(
    variables: &[Variable],
    collection_id: &str,
    roots: I,
    include_all: bool,
    policy: &UsagePolicy,
) -> UsageReport
where
    I: IntoIterator<Item = &'a Node>,
{
    partition_usage(variables, collection_id, collect_used_ids(roots), include_all, policy)
}
