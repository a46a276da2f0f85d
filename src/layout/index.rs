use std::collections::{BTreeMap, BTreeSet};

use super::{LinkLayout, NodeKey, NodeKind, NodeLayout};

/// Adjacency over the derived links, built once per full layout.
///
/// Parent/child follow link direction (from → to), so a step is a child of
/// its group's node only in the sense that it feeds it. The drag path reads
/// this index and never mutates it; topology changes go through a full
/// re-layout.
#[derive(Debug, Clone, Default)]
pub struct LinkIndex {
    children_by_parent: BTreeMap<NodeKey, Vec<NodeKey>>,
    parents_by_child: BTreeMap<NodeKey, Vec<NodeKey>>,
    links_by_node: BTreeMap<NodeKey, Vec<usize>>,
}

impl LinkIndex {
    pub fn build(links: &[LinkLayout]) -> Self {
        let mut index = LinkIndex::default();
        for (idx, link) in links.iter().enumerate() {
            index
                .children_by_parent
                .entry(link.to.clone())
                .or_default()
                .push(link.from.clone());
            index
                .parents_by_child
                .entry(link.from.clone())
                .or_default()
                .push(link.to.clone());
            index.links_by_node.entry(link.from.clone()).or_default().push(idx);
            if link.to != link.from {
                index.links_by_node.entry(link.to.clone()).or_default().push(idx);
            }
        }
        index
    }

    /// Nodes with a link pointing into `key`.
    pub fn children(&self, key: &NodeKey) -> &[NodeKey] {
        self.children_by_parent
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Nodes `key` links out to.
    pub fn parents(&self, key: &NodeKey) -> &[NodeKey] {
        self.parents_by_child
            .get(key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Link indices touching any of `keys`, ascending and deduplicated.
    pub fn links_touching<'a>(&self, keys: impl IntoIterator<Item = &'a NodeKey>) -> Vec<usize> {
        let mut out = BTreeSet::new();
        for key in keys {
            if let Some(indices) = self.links_by_node.get(key) {
                out.extend(indices.iter().copied());
            }
        }
        out.into_iter().collect()
    }
}

/// Which nodes hang off which: steps per group, parts per step.
#[derive(Debug, Clone, Default)]
pub struct MemberIndex {
    groups: Vec<NodeKey>,
    steps_by_group: BTreeMap<String, Vec<NodeKey>>,
    parts_by_step: BTreeMap<String, Vec<NodeKey>>,
}

impl MemberIndex {
    pub fn build(nodes: &BTreeMap<NodeKey, NodeLayout>) -> Self {
        let mut index = MemberIndex::default();
        for (key, node) in nodes {
            match &node.kind {
                NodeKind::Group { .. } => index.groups.push(key.clone()),
                NodeKind::Step { group_id, .. } => index
                    .steps_by_group
                    .entry(group_id.clone())
                    .or_default()
                    .push(key.clone()),
                NodeKind::Part { step_id, .. } => index
                    .parts_by_step
                    .entry(step_id.clone())
                    .or_default()
                    .push(key.clone()),
                NodeKind::Root { .. } => {}
            }
        }
        index
    }

    pub fn groups(&self) -> &[NodeKey] {
        &self.groups
    }

    pub fn steps_in(&self, group_id: &str) -> &[NodeKey] {
        self.steps_by_group
            .get(group_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn parts_of(&self, step_id: &str) -> &[NodeKey] {
        self.parts_by_step
            .get(step_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
