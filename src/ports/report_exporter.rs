//! Report Text Exporter
//!
//! Renders an audit outcome as the plain text block the host drops onto
//! the canvas.

use crate::domain::integrity::{IntegrityReport, PluralForm};
use crate::domain::outcome::AuditOutcome;
use crate::domain::usage::UsageReport;
use std::io::Result;

pub const ALL_USED: &str = "✅ All variables are used";
pub const UNUSED_HEADER: &str = "🟡 Unused variables:";
pub const ALL_SORTED_HEADER: &str = "📦 All variables (structural order):";
pub const NO_BROKEN: &str = "✅ No broken variables found";
pub const BROKEN_HEADER: &str = "🔴 Broken variables";
pub const NOTHING_SELECTED: &str = "⚠️ Nothing selected: select at least one layer to check";

pub struct ReportExporter;

impl ReportExporter {
    /// Write the text report to `path`.
    pub fn export(outcome: &AuditOutcome, path: &str) -> Result<()> {
        std::fs::write(path, Self::to_text(outcome))
    }

    pub fn to_text(outcome: &AuditOutcome) -> String {
        match outcome {
            AuditOutcome::Usage(report) => Self::usage_text(report),
            AuditOutcome::Integrity(report) => Self::integrity_text(report),
            AuditOutcome::NothingSelected => NOTHING_SELECTED.to_string(),
        }
    }

    /// One-line headline, used by the server's `message` field.
    pub fn headline(outcome: &AuditOutcome) -> String {
        match outcome {
            AuditOutcome::Usage(report) if report.unused.is_empty() => ALL_USED.to_string(),
            AuditOutcome::Usage(report) => format!("{} {}", UNUSED_HEADER, report.unused.len()),
            AuditOutcome::Integrity(report) if report.broken.is_empty() => NO_BROKEN.to_string(),
            AuditOutcome::Integrity(report) => {
                format!("{}: {}", BROKEN_HEADER, Self::count_phrase(report.broken_ids().len()))
            }
            AuditOutcome::NothingSelected => NOTHING_SELECTED.to_string(),
        }
    }

    fn usage_text(report: &UsageReport) -> String {
        let mut blocks = Vec::new();

        if let Some(all) = &report.all_sorted {
            blocks.push(Self::bullets(ALL_SORTED_HEADER, all.iter().map(String::as_str)));
        }

        if report.unused.is_empty() {
            blocks.push(ALL_USED.to_string());
        } else {
            blocks.push(Self::bullets(
                UNUSED_HEADER,
                report.unused.iter().map(|v| v.name.as_str()),
            ));
        }

        blocks.join("\n\n")
    }

    fn integrity_text(report: &IntegrityReport) -> String {
        if report.broken.is_empty() {
            return NO_BROKEN.to_string();
        }

        let mut lines = vec![format!(
            "{}: {}",
            BROKEN_HEADER,
            Self::count_phrase(report.broken_ids().len())
        )];

        for (node, properties) in &report.summary.nodes {
            lines.push(String::new());
            lines.push(node.clone());
            for (property, count) in properties {
                lines.push(format!("  {}: {}", property, Self::count_phrase(*count)));
            }
        }

        lines.push(String::new());
        lines.push("Details:".to_string());
        for item in &report.broken {
            lines.push(format!(
                "• {} ({}) {} → {}: {}",
                item.record.node_name,
                item.record.node_id,
                item.record.property,
                item.record.variable_id,
                item.reason
            ));
        }

        lines.join("\n")
    }

    fn bullets<'a>(header: &str, items: impl Iterator<Item = &'a str>) -> String {
        let mut text = header.to_string();
        for item in items {
            text.push_str("\n• ");
            text.push_str(item);
        }
        text
    }

    pub fn count_phrase(count: usize) -> String {
        let noun = match PluralForm::for_count(count) {
            PluralForm::One => "broken variable",
            PluralForm::Few => "broken variables",
            PluralForm::Many => "broken variables",
        };
        format!("{} {}", count, noun)
    }
}
