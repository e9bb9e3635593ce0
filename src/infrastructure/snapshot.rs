//! Document Snapshot Loader
//!
//! Reads the JSON snapshot the host exports (page tree, selection and the
//! variable catalog) and serves it as a `DocumentProvider` plus the records
//! needed to seed a variable store.

use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Deserialize;

use crate::domain::document::Node;
use crate::domain::error::DocumentError;
use crate::domain::store::{MemoryVariableStore, StoreRecords};
use crate::domain::variable::{Literal, Rgba, Variable, VariableCollection, VariableValue};
use crate::ports::DocumentProvider;

/// Page tree plus the ids of the selected nodes.
#[derive(Debug, Clone, Default)]
pub struct SnapshotDocument {
    pub page_id: String,
    pub page_name: String,
    roots: Vec<Node>,
    selection: Vec<String>,
}

impl SnapshotDocument {
    pub fn new(roots: Vec<Node>, selection: Vec<String>) -> Self {
        Self {
            roots,
            selection,
            ..Default::default()
        }
    }

    /// Replace the selection, e.g. from `--select` on the command line.
    pub fn select(&mut self, ids: Vec<String>) {
        self.selection = ids;
    }

    pub fn find(&self, id: &str) -> Option<&Node> {
        self.roots.iter().find_map(|root| root.find(id))
    }
}

impl DocumentProvider for SnapshotDocument {
    fn current_selection_roots(&self) -> Result<Vec<&Node>, DocumentError> {
        self.selection
            .iter()
            .map(|id| self.find(id).ok_or_else(|| DocumentError::MissingNode(id.clone())))
            .collect()
    }

    fn current_page_roots(&self) -> Result<Vec<&Node>, DocumentError> {
        Ok(self.roots.iter().collect())
    }
}

/// A loaded snapshot.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub document: SnapshotDocument,
    pub records: StoreRecords,
}

impl Snapshot {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read snapshot {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Invalid snapshot {}", path.display()))
    }

    pub fn parse(json: &str) -> Result<Self> {
        let file: SnapshotFile = serde_json::from_str(json).context("Malformed snapshot JSON")?;
        Ok(file.into())
    }

    pub fn memory_store(&self) -> MemoryVariableStore {
        MemoryVariableStore::from_records(&self.records)
    }
}

// ============================================================================
// Snapshot file format
// ============================================================================

#[derive(Debug, Deserialize)]
struct SnapshotFile {
    page: PageFile,
    #[serde(default)]
    selection: Vec<String>,
    #[serde(default)]
    collections: Vec<CollectionFile>,
    #[serde(default)]
    variables: Vec<VariableFile>,
}

#[derive(Debug, Default, Deserialize)]
struct PageFile {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    children: Vec<Node>,
}

#[derive(Debug, Deserialize)]
struct CollectionFile {
    id: String,
    name: String,
    #[serde(default)]
    remote: bool,
    #[serde(default)]
    unavailable: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VariableFile {
    id: String,
    name: String,
    variable_collection_id: String,
    #[serde(default)]
    values_by_mode: IndexMap<String, WireValue>,
    #[serde(default)]
    remote: bool,
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    deleted: bool,
}

#[derive(Debug, Deserialize)]
enum AliasTag {
    #[serde(rename = "VARIABLE_ALIAS")]
    VariableAlias,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireValue {
    Alias {
        #[serde(rename = "type")]
        _kind: AliasTag,
        id: String,
    },
    Color(Rgba),
    Bool(bool),
    Number(f64),
    Text(String),
}

impl From<WireValue> for VariableValue {
    fn from(value: WireValue) -> Self {
        match value {
            WireValue::Alias { id, .. } => VariableValue::Alias(id),
            WireValue::Color(rgba) => VariableValue::Literal(Literal::Color(rgba)),
            WireValue::Bool(b) => VariableValue::Literal(Literal::Bool(b)),
            WireValue::Number(n) => VariableValue::Literal(Literal::Number(n)),
            WireValue::Text(s) => VariableValue::Literal(Literal::Text(s)),
        }
    }
}

impl From<SnapshotFile> for Snapshot {
    fn from(file: SnapshotFile) -> Self {
        let mut records = StoreRecords::default();

        for collection in file.collections {
            if collection.unavailable {
                records.unavailable.push(collection.id.clone());
            }
            records.collections.push(VariableCollection {
                id: collection.id,
                name: collection.name,
                remote: collection.remote,
            });
        }

        for variable in file.variables {
            if variable.deleted {
                records.deleted.push(variable.id.clone());
            }
            records.variables.push(Variable {
                id: variable.id,
                name: variable.name,
                collection_id: variable.variable_collection_id,
                values_by_mode: variable
                    .values_by_mode
                    .into_iter()
                    .map(|(mode, value)| (mode, value.into()))
                    .collect(),
                remote: variable.remote,
                key: variable.key,
            });
        }

        let document = SnapshotDocument {
            page_id: file.page.id,
            page_name: file.page.name,
            roots: file.page.children,
            selection: file.selection,
        };

        Snapshot { document, records }
    }
}
