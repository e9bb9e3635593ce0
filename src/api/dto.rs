use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::domain::integrity::BrokenBinding;
use crate::domain::outcome::AuditOutcome;
use crate::domain::variable::{Variable, VariableCollection};
use crate::ports::report_exporter::ReportExporter;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableDto {
    pub id: String,
    pub name: String,
    pub collection_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionDto {
    pub id: String,
    pub name: String,
    pub remote: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokenBindingDto {
    pub node_id: String,
    pub node_name: String,
    pub property: String,
    pub variable_id: String,
    pub reason: String,
    pub reason_text: String,
}

/// Result structure handed to report sinks and API clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditResultDto {
    /// `ok` or `nothing-selected`.
    pub status: String,
    pub message: String,
    pub unused_list: Vec<VariableDto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_sorted_list: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broken_bindings: Option<Vec<BrokenBindingDto>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broken_summary: Option<IndexMap<String, IndexMap<String, usize>>>,
}

impl From<&Variable> for VariableDto {
    fn from(v: &Variable) -> Self {
        VariableDto {
            id: v.id.clone(),
            name: v.name.clone(),
            collection_id: v.collection_id.clone(),
        }
    }
}

impl From<&VariableCollection> for CollectionDto {
    fn from(c: &VariableCollection) -> Self {
        CollectionDto {
            id: c.id.clone(),
            name: c.name.clone(),
            remote: c.remote,
        }
    }
}

impl From<&BrokenBinding> for BrokenBindingDto {
    fn from(b: &BrokenBinding) -> Self {
        BrokenBindingDto {
            node_id: b.record.node_id.clone(),
            node_name: b.record.node_name.clone(),
            property: b.record.property.clone(),
            variable_id: b.record.variable_id.clone(),
            reason: b.reason.code().to_string(),
            reason_text: b.reason.to_string(),
        }
    }
}

impl From<&AuditOutcome> for AuditResultDto {
    fn from(outcome: &AuditOutcome) -> Self {
        let message = ReportExporter::headline(outcome);
        match outcome {
            AuditOutcome::Usage(report) => AuditResultDto {
                status: "ok".to_string(),
                message,
                unused_list: report.unused.iter().map(VariableDto::from).collect(),
                all_sorted_list: report.all_sorted.clone(),
                broken_bindings: None,
                broken_summary: None,
            },
            AuditOutcome::Integrity(report) => AuditResultDto {
                status: "ok".to_string(),
                message,
                unused_list: Vec::new(),
                all_sorted_list: None,
                broken_bindings: Some(report.broken.iter().map(BrokenBindingDto::from).collect()),
                broken_summary: Some(report.summary.nodes.clone()),
            },
            AuditOutcome::NothingSelected => AuditResultDto {
                status: "nothing-selected".to_string(),
                message,
                unused_list: Vec::new(),
                all_sorted_list: None,
                broken_bindings: None,
                broken_summary: None,
            },
        }
    }
}
