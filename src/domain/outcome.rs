use crate::domain::integrity::IntegrityReport;
use crate::domain::usage::UsageReport;

/// Result of one audit run, handed to a report sink.
#[derive(Debug, Clone, PartialEq)]
pub enum AuditOutcome {
    Usage(UsageReport),
    Integrity(IntegrityReport),
    /// The integrity check was requested with an empty selection.
    NothingSelected,
}
