//! Document Tree Module
//!
//! A snapshot of the design document as the host hands it over. Every node
//! owns its children, and each styling channel is optional so the scanner
//! asks a node what it carries instead of probing its shape.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Type tag the host puts on variable references.
pub const ALIAS_TYPE: &str = "VARIABLE_ALIAS";

/// Pointer from a styling channel to a variable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableRef {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
}

impl VariableRef {
    pub fn to(id: impl Into<String>) -> Self {
        Self {
            kind: Some(ALIAS_TYPE.to_string()),
            id: Some(id.into()),
        }
    }

    /// The referenced variable id. Partially specified references yield `None`.
    pub fn target(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.is_empty())
    }
}

/// Value stored under a key of a node's binding map.
///
/// Typography properties can bind per character range, in which case the
/// host sends a list (with holes for unbound ranges).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Binding {
    Single(VariableRef),
    Ranges(Vec<Option<VariableRef>>),
}

impl Binding {
    pub fn refs(&self) -> Box<dyn Iterator<Item = &VariableRef> + '_> {
        match self {
            Binding::Single(reference) => Box::new(std::iter::once(reference)),
            Binding::Ranges(ranges) => Box::new(ranges.iter().flatten()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaintBindings {
    #[serde(default)]
    pub color: Option<VariableRef>,
}

/// A fill or stroke descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paint {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(rename = "boundVariables", default)]
    pub bound_variables: Option<PaintBindings>,
}

impl Paint {
    pub fn solid() -> Self {
        Self {
            kind: Some("SOLID".to_string()),
            bound_variables: None,
        }
    }

    pub fn bound_to(id: impl Into<String>) -> Self {
        Self {
            kind: Some("SOLID".to_string()),
            bound_variables: Some(PaintBindings {
                color: Some(VariableRef::to(id)),
            }),
        }
    }

    pub fn bound_color(&self) -> Option<&VariableRef> {
        self.bound_variables.as_ref()?.color.as_ref()
    }
}

/// A node in the document tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(rename = "boundVariables", default)]
    pub bound_variables: Option<IndexMap<String, Option<Binding>>>,
    #[serde(default)]
    pub fills: Option<Vec<Paint>>,
    #[serde(default)]
    pub strokes: Option<Vec<Paint>>,
    #[serde(default)]
    pub children: Option<Vec<Node>>,
}

impl Node {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_binding(mut self, property: impl Into<String>, binding: Binding) -> Self {
        self.bound_variables
            .get_or_insert_with(IndexMap::new)
            .insert(property.into(), Some(binding));
        self
    }

    pub fn with_fill(mut self, paint: Paint) -> Self {
        self.fills.get_or_insert_with(Vec::new).push(paint);
        self
    }

    pub fn with_stroke(mut self, paint: Paint) -> Self {
        self.strokes.get_or_insert_with(Vec::new).push(paint);
        self
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.get_or_insert_with(Vec::new).push(child);
        self
    }

    pub fn has_bindings(&self) -> bool {
        self.bound_variables.as_ref().is_some_and(|map| !map.is_empty())
    }

    pub fn has_fills(&self) -> bool {
        self.fills.as_ref().is_some_and(|fills| !fills.is_empty())
    }

    pub fn has_strokes(&self) -> bool {
        self.strokes.as_ref().is_some_and(|strokes| !strokes.is_empty())
    }

    pub fn has_children(&self) -> bool {
        self.children.as_ref().is_some_and(|children| !children.is_empty())
    }

    /// Bound properties in host order, skipping null entries.
    pub fn bindings(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.bound_variables
            .iter()
            .flatten()
            .filter_map(|(property, binding)| binding.as_ref().map(|b| (property.as_str(), b)))
    }

    pub fn fills(&self) -> &[Paint] {
        self.fills.as_deref().unwrap_or_default()
    }

    pub fn strokes(&self) -> &[Paint] {
        self.strokes.as_deref().unwrap_or_default()
    }

    pub fn children(&self) -> &[Node] {
        self.children.as_deref().unwrap_or_default()
    }

    /// Depth-first lookup of a node by id, including `self`.
    pub fn find(&self, id: &str) -> Option<&Node> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.id == id {
                return Some(node);
            }
            stack.extend(node.children().iter().rev());
        }
        None
    }
}
