//! Tree Walker
//!
//! Depth-first pre-order traversal that feeds every reference found by the
//! extractor into a sink. Two sinks exist: a deduplicated id set (usage mode)
//! and an ordered list of binding records (binding mode).

use std::collections::HashSet;

use dashmap::DashSet;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::document::Node;
use crate::domain::extract::{extract_references, BoundReference};

/// Ids referenced somewhere in the scanned tree. Only ever grows during a run.
pub type UsedIdSet = HashSet<String>;

/// Receives references as the walker discovers them.
pub trait ReferenceSink {
    fn accept(&mut self, node: &Node, reference: BoundReference<'_>);
}

impl ReferenceSink for UsedIdSet {
    fn accept(&mut self, _node: &Node, reference: BoundReference<'_>) {
        if !self.contains(reference.variable_id) {
            self.insert(reference.variable_id.to_string());
        }
    }
}

/// One discovered binding, with the node it sits on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingRecord {
    pub node_id: String,
    pub node_name: String,
    pub property: String,
    pub variable_id: String,
}

impl ReferenceSink for Vec<BindingRecord> {
    fn accept(&mut self, node: &Node, reference: BoundReference<'_>) {
        self.push(BindingRecord {
            node_id: node.id.clone(),
            node_name: node.name.clone(),
            property: reference.property.to_string(),
            variable_id: reference.variable_id.to_string(),
        });
    }
}

/// How usage-mode scans spread work over top-level roots.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Yield to the runtime before each root; roots are merged in order.
    #[default]
    Cooperative,
    /// Scan roots on the rayon pool.
    Parallel,
}

/// Walk `root` and its descendants in pre-order.
pub fn walk<S: ReferenceSink>(root: &Node, sink: &mut S) {
    // Explicit stack: deeply nested frames must not exhaust the call stack.
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        for reference in extract_references(node) {
            sink.accept(node, reference);
        }
        if node.has_children() {
            stack.extend(node.children().iter().rev());
        }
    }
}

pub fn collect_used_ids<'a, I>(roots: I) -> UsedIdSet
where
    I: IntoIterator<Item = &'a Node>,
{
    let mut used = UsedIdSet::new();
    for root in roots {
        walk(root, &mut used);
    }
    used
}

/// Usage-mode scan that hands control back to the runtime before every root.
pub async fn collect_used_ids_cooperative(roots: &[&Node]) -> UsedIdSet {
    let mut used = UsedIdSet::new();
    for (index, root) in roots.iter().enumerate() {
        tokio::task::yield_now().await;
        walk(root, &mut used);
        debug!(root = %root.id, index, used = used.len(), "scanned root");
    }
    used
}

/// Usage-mode scan with roots distributed over the rayon pool.
pub fn collect_used_ids_parallel(roots: &[&Node]) -> UsedIdSet {
    let shared: DashSet<String> = DashSet::new();

    roots.par_iter().for_each(|root| {
        let mut local = UsedIdSet::new();
        walk(root, &mut local);
        for id in local {
            shared.insert(id);
        }
    });

    shared.into_iter().collect()
}

/// Drop roots that repeat or sit inside another root, so no node is walked twice.
pub fn outermost_roots<'a>(roots: &[&'a Node]) -> Vec<&'a Node> {
    let mut nested: HashSet<&str> = HashSet::new();
    for root in roots {
        let mut stack: Vec<&Node> = root.children().iter().collect();
        while let Some(node) = stack.pop() {
            nested.insert(node.id.as_str());
            stack.extend(node.children());
        }
    }

    let mut seen: HashSet<&str> = HashSet::new();
    roots
        .iter()
        .copied()
        .filter(|root| !nested.contains(root.id.as_str()) && seen.insert(root.id.as_str()))
        .collect()
}

/// Binding-mode scan: every discovery is kept, in traversal order.
pub fn collect_bindings<'a, I>(roots: I) -> Vec<BindingRecord>
where
    I: IntoIterator<Item = &'a Node>,
{
    let mut records = Vec::new();
    for root in roots {
        walk(root, &mut records);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::{Binding, Paint, VariableRef};

    fn sample_tree() -> Vec<Node> {
        let card = Node::new("1:1", "Card")
            .with_fill(Paint::bound_to("V:bg"))
            .with_child(
                Node::new("1:2", "Title")
                    .with_binding("fontSize", Binding::Single(VariableRef::to("V:size")))
                    .with_fill(Paint::bound_to("V:text")),
            )
            .with_child(Node::new("1:3", "Divider").with_stroke(Paint::bound_to("V:bg")));
        let footer = Node::new("2:1", "Footer").with_fill(Paint::bound_to("V:bg"));
        vec![card, footer]
    }

    #[test]
    fn test_pre_order_binding_records() {
        let roots = sample_tree();
        let records = collect_bindings(&roots);
        let order: Vec<(&str, &str)> = records
            .iter()
            .map(|r| (r.node_id.as_str(), r.variable_id.as_str()))
            .collect();

        assert_eq!(
            order,
            vec![
                ("1:1", "V:bg"),
                ("1:2", "V:size"),
                ("1:2", "V:text"),
                ("1:3", "V:bg"),
                ("2:1", "V:bg"),
            ]
        );
        assert_eq!(records[3].property, "strokes.color");
    }

    #[test]
    fn test_usage_mode_dedups() {
        let roots = sample_tree();
        let used = collect_used_ids(&roots);
        assert_eq!(used.len(), 3);
        assert!(used.contains("V:bg"));
    }

    #[test]
    fn test_idempotent_scan() {
        let roots = sample_tree();
        assert_eq!(collect_used_ids(&roots), collect_used_ids(&roots));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let roots = sample_tree();
        let refs: Vec<&Node> = roots.iter().collect();
        assert_eq!(collect_used_ids_parallel(&refs), collect_used_ids(&roots));
    }

    #[tokio::test]
    async fn test_cooperative_matches_sequential() {
        let roots = sample_tree();
        let refs: Vec<&Node> = roots.iter().collect();
        assert_eq!(collect_used_ids_cooperative(&refs).await, collect_used_ids(&roots));
    }

    #[test]
    fn test_nested_selection_walked_once() {
        let roots = sample_tree();
        let card = &roots[0];
        let title = card.find("1:2").unwrap();
        let footer = &roots[1];

        let selected = outermost_roots(&[title, card, footer, card]);
        let ids: Vec<&str> = selected.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["1:1", "2:1"]);

        let records = collect_bindings(selected);
        let title_records = records.iter().filter(|r| r.node_id == "1:2").count();
        assert_eq!(title_records, 2);
        assert_eq!(records.len(), 5);
    }

    #[test]
    fn test_deep_tree_does_not_overflow() {
        let mut node = Node::new("leaf", "Leaf").with_fill(Paint::bound_to("V:deep"));
        for depth in 0..50_000 {
            node = Node::new(format!("n{}", depth), "Group").with_child(node);
        }
        let used = collect_used_ids(std::iter::once(&node));
        assert!(used.contains("V:deep"));
        // Drop iteratively; the derived Drop recursion would overflow here.
        let mut current = Some(node);
        while let Some(mut n) = current {
            current = n.children.take().and_then(|mut c| c.pop());
        }
    }
}
