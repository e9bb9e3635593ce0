use crate::domain::document::Node;
use crate::domain::error::DocumentError;
use crate::domain::outcome::AuditOutcome;

pub mod report_exporter;

/// Access to the document being audited.
pub trait DocumentProvider: Send + Sync {
    /// Top-level nodes of the current selection, in selection order.
    fn current_selection_roots(&self) -> Result<Vec<&Node>, DocumentError>;
    /// Direct children of the current page, in document order.
    fn current_page_roots(&self) -> Result<Vec<&Node>, DocumentError>;
}

/// Receives the result of a run and renders it somewhere.
pub trait ReportSink {
    fn publish(&self, outcome: &AuditOutcome) -> anyhow::Result<()>;
}
