// Application layer: runs one audit request against the document and store.

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::domain::integrity::IntegrityValidator;
use crate::domain::outcome::AuditOutcome;
use crate::domain::store::{known_local_ids, VariableStore};
use crate::domain::usage::{partition_usage, UsagePolicy};
use crate::domain::variable::VariableCollection;
use crate::domain::walker::{
    collect_bindings, collect_used_ids_cooperative, collect_used_ids_parallel, outermost_roots, ScanMode,
};
use crate::ports::DocumentProvider;

/// The two questions a run can answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditRequest {
    AnalyzeCollection { collection_id: String, include_all: bool },
    CheckBrokenVariables,
}

pub struct AuditUsecase<'a> {
    pub document: &'a dyn DocumentProvider,
    pub store: &'a dyn VariableStore,
    pub policy: &'a UsagePolicy,
    pub scan_mode: ScanMode,
}

impl<'a> AuditUsecase<'a> {
    /// Each call is an independent run; nothing is shared between runs.
    pub async fn run(&self, request: &AuditRequest) -> Result<AuditOutcome> {
        match request {
            AuditRequest::AnalyzeCollection { collection_id, include_all } => {
                self.analyze_collection(collection_id, *include_all).await
            }
            AuditRequest::CheckBrokenVariables => self.check_broken_variables().await,
        }
    }

    pub async fn list_collections(&self) -> Result<Vec<VariableCollection>> {
        self.store
            .list_collections()
            .await
            .context("Failed to list variable collections")
    }

    pub async fn analyze_collection(&self, collection_id: &str, include_all: bool) -> Result<AuditOutcome> {
        let variables = self
            .store
            .list_all_variables()
            .await
            .context("Failed to list local variables")?;

        if !self.list_collections().await?.iter().any(|c| c.id == collection_id) {
            warn!(collection = %collection_id, "collection is not listed by the store");
        }

        let roots = self
            .document
            .current_page_roots()
            .context("Failed to read the current page")?;

        let used_ids = match self.scan_mode {
            ScanMode::Cooperative => collect_used_ids_cooperative(&roots).await,
            ScanMode::Parallel => collect_used_ids_parallel(&roots),
        };

        let report = partition_usage(&variables, collection_id, used_ids, include_all, self.policy);
        info!(
            collection = %collection_id,
            roots = roots.len(),
            used = report.used.len(),
            unused = report.unused.len(),
            "collection analyzed"
        );

        Ok(AuditOutcome::Usage(report))
    }

    pub async fn check_broken_variables(&self) -> Result<AuditOutcome> {
        let roots = self
            .document
            .current_selection_roots()
            .context("Failed to read the current selection")?;

        if roots.is_empty() {
            info!("integrity check requested with an empty selection");
            return Ok(AuditOutcome::NothingSelected);
        }

        let records = collect_bindings(outermost_roots(&roots));
        let known = known_local_ids(self.store)
            .await
            .context("Failed to list local variables")?;

        let report = IntegrityValidator::new(self.store, &known).validate(&records).await;
        info!(
            bindings = records.len(),
            checked = report.checked,
            broken = report.broken.len(),
            "integrity check finished"
        );

        Ok(AuditOutcome::Integrity(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::{Node, Paint};
    use crate::domain::store::{MemoryVariableStore, StoreRecords};
    use crate::domain::variable::Variable;
    use crate::infrastructure::SnapshotDocument;

    fn fixture() -> (SnapshotDocument, MemoryVariableStore) {
        let document = SnapshotDocument::new(
            vec![
                Node::new("1:1", "Card").with_fill(Paint::bound_to("A")),
                Node::new("1:2", "Badge").with_fill(Paint::bound_to("MISSING")),
            ],
            vec![],
        );
        let store = MemoryVariableStore::from_records(&StoreRecords {
            collections: vec![VariableCollection {
                id: "C".to_string(),
                name: "Tokens".to_string(),
                remote: false,
            }],
            variables: vec![
                Variable::new("A", "color/bg/rest", "C"),
                Variable::new("B", "color/bg/hovered", "C"),
            ],
            ..Default::default()
        });
        (document, store)
    }

    #[tokio::test]
    async fn test_empty_selection_skips_validation() {
        let (document, store) = fixture();
        let policy = UsagePolicy::default();
        let usecase = AuditUsecase {
            document: &document,
            store: &store,
            policy: &policy,
            scan_mode: ScanMode::Cooperative,
        };

        let outcome = usecase.run(&AuditRequest::CheckBrokenVariables).await.unwrap();
        assert_eq!(outcome, AuditOutcome::NothingSelected);
    }

    #[tokio::test]
    async fn test_overlapping_selection_reports_each_binding_once() {
        let (_, store) = fixture();
        let mut document = SnapshotDocument::new(
            vec![Node::new("1:1", "Card")
                .with_fill(Paint::bound_to("A"))
                .with_child(Node::new("1:2", "Badge").with_fill(Paint::bound_to("GONE")))],
            vec![],
        );
        document.select(vec!["1:1".to_string(), "1:2".to_string()]);
        let policy = UsagePolicy::default();
        let usecase = AuditUsecase {
            document: &document,
            store: &store,
            policy: &policy,
            scan_mode: ScanMode::Cooperative,
        };

        match usecase.run(&AuditRequest::CheckBrokenVariables).await.unwrap() {
            AuditOutcome::Integrity(report) => {
                assert_eq!(report.checked, 2);
                assert_eq!(report.broken.len(), 1);
                assert_eq!(report.broken[0].record.node_id, "1:2");
                assert_eq!(report.summary.nodes["Badge"]["fills.color"], 1);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_both_scan_modes_agree() {
        let (document, store) = fixture();
        let policy = UsagePolicy::default();
        let request = AuditRequest::AnalyzeCollection {
            collection_id: "C".to_string(),
            include_all: false,
        };

        let mut outcomes = Vec::new();
        for scan_mode in [ScanMode::Cooperative, ScanMode::Parallel] {
            let usecase = AuditUsecase {
                document: &document,
                store: &store,
                policy: &policy,
                scan_mode,
            };
            outcomes.push(usecase.run(&request).await.unwrap());
        }

        assert_eq!(outcomes[0], outcomes[1]);
        match &outcomes[0] {
            AuditOutcome::Usage(report) => {
                assert_eq!(report.unused.len(), 1);
                assert_eq!(report.unused[0].id, "B");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_selection_check() {
        let (mut document, store) = fixture();
        document.select(vec!["1:1".to_string(), "1:2".to_string()]);
        let policy = UsagePolicy::default();
        let usecase = AuditUsecase {
            document: &document,
            store: &store,
            policy: &policy,
            scan_mode: ScanMode::Cooperative,
        };

        match usecase.run(&AuditRequest::CheckBrokenVariables).await.unwrap() {
            AuditOutcome::Integrity(report) => {
                assert_eq!(report.checked, 2);
                assert_eq!(report.broken.len(), 1);
                assert_eq!(report.broken[0].record.node_name, "Badge");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
