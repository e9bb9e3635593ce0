//! Integrity Validator
//!
//! Classifies every distinct variable id found by a binding-mode scan as
//! healthy or broken. Ids are resolved one after another against the
//! variable store; store faults are turned into a classification and never
//! abort the run.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::store::VariableStore;
use crate::domain::variable::Variable;
use crate::domain::walker::BindingRecord;

/// Why a bound variable is considered broken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum BrokenReason {
    NotFound,
    LocalDeleted,
    #[serde(rename_all = "camelCase")]
    CollectionDeleted { collection_id: String },
    #[serde(rename_all = "camelCase")]
    CollectionUnavailable { collection_id: String, message: String },
    LibraryDisabled,
    #[serde(rename_all = "camelCase")]
    BrokenAlias { mode_id: String, target_id: String },
    ResolutionError { message: String },
}

impl BrokenReason {
    pub fn code(&self) -> &'static str {
        match self {
            BrokenReason::NotFound => "not-found",
            BrokenReason::LocalDeleted => "local-deleted",
            BrokenReason::CollectionDeleted { .. } => "collection-deleted",
            BrokenReason::CollectionUnavailable { .. } => "collection-unavailable",
            BrokenReason::LibraryDisabled => "library-disabled",
            BrokenReason::BrokenAlias { .. } => "broken-alias",
            BrokenReason::ResolutionError { .. } => "resolution-error",
        }
    }
}

impl fmt::Display for BrokenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrokenReason::NotFound => write!(f, "variable not found"),
            BrokenReason::LocalDeleted => write!(f, "local variable was deleted"),
            BrokenReason::CollectionDeleted { collection_id } => {
                write!(f, "collection `{}` was deleted", collection_id)
            }
            BrokenReason::CollectionUnavailable { collection_id, message } => {
                write!(f, "collection `{}` is unavailable: {}", collection_id, message)
            }
            BrokenReason::LibraryDisabled => write!(f, "library is disabled"),
            BrokenReason::BrokenAlias { mode_id, target_id } => {
                write!(f, "alias in mode `{}` points to missing variable `{}`", mode_id, target_id)
            }
            BrokenReason::ResolutionError { message } => write!(f, "resolution error: {}", message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Healthy,
    Broken(BrokenReason),
}

/// A binding whose variable was classified as broken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokenBinding {
    pub record: BindingRecord,
    pub reason: BrokenReason,
}

/// Node name -> property -> number of distinct broken variable ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokenSummary {
    pub nodes: IndexMap<String, IndexMap<String, usize>>,
}

impl BrokenSummary {
    pub fn from_broken(broken: &[BrokenBinding]) -> Self {
        let mut grouped: IndexMap<String, IndexMap<String, IndexSet<&str>>> = IndexMap::new();
        for item in broken {
            grouped
                .entry(item.record.node_name.clone())
                .or_default()
                .entry(item.record.property.clone())
                .or_default()
                .insert(item.record.variable_id.as_str());
        }

        let nodes = grouped
            .into_iter()
            .map(|(node, properties)| {
                let counts = properties
                    .into_iter()
                    .map(|(property, ids)| (property, ids.len()))
                    .collect();
                (node, counts)
            })
            .collect();

        Self { nodes }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntegrityReport {
    /// Number of distinct variable ids that were classified.
    pub checked: usize,
    pub broken: Vec<BrokenBinding>,
    pub summary: BrokenSummary,
}

impl IntegrityReport {
    pub fn broken_ids(&self) -> IndexSet<&str> {
        self.broken.iter().map(|b| b.record.variable_id.as_str()).collect()
    }
}

pub struct IntegrityValidator<'a> {
    store: &'a dyn VariableStore,
    /// Local variable ids as listed when the run started.
    known_local_ids: &'a HashSet<String>,
}

impl<'a> IntegrityValidator<'a> {
    pub fn new(store: &'a dyn VariableStore, known_local_ids: &'a HashSet<String>) -> Self {
        Self { store, known_local_ids }
    }

    /// Classify each distinct id once, then keep the records whose id is broken.
    pub async fn validate(&self, records: &[BindingRecord]) -> IntegrityReport {
        let distinct: IndexSet<&str> = records.iter().map(|r| r.variable_id.as_str()).collect();

        let mut reasons: IndexMap<&str, BrokenReason> = IndexMap::new();
        for id in &distinct {
            match self.classify(id).await {
                Verdict::Healthy => debug!(variable = %id, "healthy"),
                Verdict::Broken(reason) => {
                    debug!(variable = %id, reason = reason.code(), "broken");
                    reasons.insert(*id, reason);
                }
            }
        }

        let broken: Vec<BrokenBinding> = records
            .iter()
            .filter_map(|record| {
                reasons.get(record.variable_id.as_str()).map(|reason| BrokenBinding {
                    record: record.clone(),
                    reason: reason.clone(),
                })
            })
            .collect();

        IntegrityReport {
            checked: distinct.len(),
            summary: BrokenSummary::from_broken(&broken),
            broken,
        }
    }

    /// First matching rule wins: existence, local deletion, collection,
    /// library, aliases.
    pub async fn classify(&self, id: &str) -> Verdict {
        let variable = match self.store.resolve_variable(id).await {
            Ok(Some(variable)) => variable,
            Ok(None) => return Verdict::Broken(BrokenReason::NotFound),
            Err(e) => {
                warn!(variable = %id, error = %e, "variable resolution failed");
                return Verdict::Broken(BrokenReason::ResolutionError { message: e.to_string() });
            }
        };

        if !variable.remote && !self.known_local_ids.contains(&variable.id) {
            return Verdict::Broken(BrokenReason::LocalDeleted);
        }

        match self.store.resolve_collection(&variable.collection_id).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                return Verdict::Broken(BrokenReason::CollectionDeleted {
                    collection_id: variable.collection_id.clone(),
                })
            }
            Err(e) => {
                warn!(collection = %variable.collection_id, error = %e, "collection resolution failed");
                return Verdict::Broken(BrokenReason::CollectionUnavailable {
                    collection_id: variable.collection_id.clone(),
                    message: e.to_string(),
                });
            }
        }

        if variable.remote && !variable.has_library_key() {
            return Verdict::Broken(BrokenReason::LibraryDisabled);
        }

        match self.check_aliases(&variable).await {
            Some(reason) => Verdict::Broken(reason),
            None => Verdict::Healthy,
        }
    }

    /// Follow every alias reachable from `origin`; stop at the first target
    /// that does not resolve.
    async fn check_aliases(&self, origin: &Variable) -> Option<BrokenReason> {
        let mut pending: VecDeque<(String, String)> = origin
            .alias_targets()
            .map(|(mode, target)| (mode.to_string(), target.to_string()))
            .collect();
        let mut visited: HashSet<String> = HashSet::from([origin.id.clone()]);

        while let Some((mode_id, target_id)) = pending.pop_front() {
            if !visited.insert(target_id.clone()) {
                continue;
            }
            match self.store.resolve_variable(&target_id).await {
                Ok(Some(next)) => pending.extend(
                    next.alias_targets()
                        .map(|(_, target)| (mode_id.clone(), target.to_string())),
                ),
                Ok(None) => return Some(BrokenReason::BrokenAlias { mode_id, target_id }),
                Err(e) => {
                    warn!(variable = %target_id, error = %e, "alias target resolution failed");
                    return Some(BrokenReason::ResolutionError { message: e.to_string() });
                }
            }
        }

        None
    }
}

/// Grammatical number of a count: 1 / 2-4 / 5 and more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluralForm {
    One,
    Few,
    Many,
}

impl PluralForm {
    pub fn for_count(count: usize) -> Self {
        match count {
            1 => PluralForm::One,
            2..=4 => PluralForm::Few,
            _ => PluralForm::Many,
        }
    }
}
