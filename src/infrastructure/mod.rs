// Infrastructure implementations for tokenscope.

pub mod concurrency;
pub mod config;
pub mod snapshot;

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::api::dto::AuditResultDto;
use crate::domain::outcome::AuditOutcome;
use crate::ports::report_exporter::ReportExporter;
use crate::ports::ReportSink;

pub use snapshot::{Snapshot, SnapshotDocument};

/// Plain-text report, to a file or stdout.
pub struct TextReportSink {
    pub output: Option<PathBuf>,
}

impl ReportSink for TextReportSink {
    fn publish(&self, outcome: &AuditOutcome) -> Result<()> {
        match &self.output {
            Some(path) => ReportExporter::export(outcome, &path.to_string_lossy())
                .with_context(|| format!("Failed to write report {}", path.display())),
            None => {
                println!("{}", ReportExporter::to_text(outcome));
                Ok(())
            }
        }
    }
}

/// Pretty-printed `AuditResultDto`, to a file or stdout.
pub struct JsonReportSink {
    pub output: Option<PathBuf>,
}

impl ReportSink for JsonReportSink {
    fn publish(&self, outcome: &AuditOutcome) -> Result<()> {
        let json = serde_json::to_string_pretty(&AuditResultDto::from(outcome))
            .context("Failed to serialize report")?;
        match &self.output {
            Some(path) => std::fs::write(path, json)
                .with_context(|| format!("Failed to write report {}", path.display())),
            None => {
                println!("{}", json);
                Ok(())
            }
        }
    }
}
