//! Reference Extractor
//!
//! Pulls every variable reference bound directly on one node. Children are
//! the walker's business.

use crate::domain::document::{Node, Paint, VariableRef};

/// Property name reported for fill colour bindings.
pub const FILL_COLOR: &str = "fills.color";
/// Property name reported for stroke colour bindings.
pub const STROKE_COLOR: &str = "strokes.color";

/// A reference found on a node, borrowed from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundReference<'a> {
    pub property: &'a str,
    pub variable_id: &'a str,
}

/// Collect `(property, variable id)` pairs bound on `node`.
///
/// Order: binding map entries in host order (list values element by element),
/// then fills, then strokes. References without an id are dropped.
pub fn extract_references(node: &Node) -> Vec<BoundReference<'_>> {
    let mut found = Vec::new();

    if node.has_bindings() {
        for (property, binding) in node.bindings() {
            for reference in binding.refs() {
                push_target(&mut found, property, reference);
            }
        }
    }

    if node.has_fills() {
        collect_paints(&mut found, FILL_COLOR, node.fills());
    }

    if node.has_strokes() {
        collect_paints(&mut found, STROKE_COLOR, node.strokes());
    }

    found
}

fn collect_paints<'a>(found: &mut Vec<BoundReference<'a>>, property: &'a str, paints: &'a [Paint]) {
    for paint in paints {
        if let Some(reference) = paint.bound_color() {
            push_target(found, property, reference);
        }
    }
}

fn push_target<'a>(found: &mut Vec<BoundReference<'a>>, property: &'a str, reference: &'a VariableRef) {
    if let Some(variable_id) = reference.target() {
        found.push(BoundReference { property, variable_id });
    }
}
