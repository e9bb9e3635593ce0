// Variable model: design tokens, their collections and per-mode values.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableCollection {
    pub id: String,
    pub name: String,
    pub remote: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    #[serde(default = "opaque")]
    pub a: f64,
}

fn opaque() -> f64 {
    1.0
}

/// A terminal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Bool(bool),
    Number(f64),
    Text(String),
    Color(Rgba),
}

/// Value of a variable in one mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VariableValue {
    Literal(Literal),
    /// Points at another variable by id.
    Alias(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub id: String,
    pub name: String,
    pub collection_id: String,
    pub values_by_mode: IndexMap<String, VariableValue>,
    pub remote: bool,
    /// Library key; remote variables without one come from a disabled library.
    pub key: Option<String>,
}

impl Variable {
    pub fn new(id: impl Into<String>, name: impl Into<String>, collection_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            collection_id: collection_id.into(),
            values_by_mode: IndexMap::new(),
            remote: false,
            key: None,
        }
    }

    pub fn with_value(mut self, mode_id: impl Into<String>, value: VariableValue) -> Self {
        self.values_by_mode.insert(mode_id.into(), value);
        self
    }

    pub fn remote_from(mut self, key: Option<&str>) -> Self {
        self.remote = true;
        self.key = key.map(str::to_string);
        self
    }

    /// `(mode id, target id)` for every mode whose value is an alias.
    pub fn alias_targets(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values_by_mode.iter().filter_map(|(mode, value)| match value {
            VariableValue::Alias(target) => Some((mode.as_str(), target.as_str())),
            VariableValue::Literal(_) => None,
        })
    }

    pub fn has_library_key(&self) -> bool {
        self.key.as_deref().is_some_and(|key| !key.is_empty())
    }
}
