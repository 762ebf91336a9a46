//! Nodes: shared details plus independently weighted copies.
//!
//! Every phase that needs its own view of a node's eligibility works on a
//! [`Node`] copy; identity, status and load live once in [`NodeDetails`],
//! addressed by [`NodeId`].

use crate::input::NodeKind;
use crate::score::Score;
use crate::types::{NodeId, ResourceId};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// SHARED DETAILS
// =============================================================================

/// Shared per-node record. One per node per pass.
#[derive(Debug, Clone)]
pub struct NodeDetails {
    pub id: NodeId,
    pub uuid: String,
    pub name: String,
    pub kind: NodeKind,
    pub online: bool,
    pub unclean: bool,
    pub shutdown: bool,
    pub standby: bool,
    pub attributes: BTreeMap<String, String>,
    /// Resources allocated here during this pass.
    pub num_resources: u32,
    /// Resources found active here by history replay.
    pub running: BTreeSet<ResourceId>,
}

impl NodeDetails {
    /// Weight a fresh copy of this node starts with, and whether it is fixed.
    #[must_use]
    pub fn base_weight(&self) -> (Score, bool) {
        if !self.online || self.shutdown || self.unclean || self.kind == NodeKind::Ping {
            (Score::NEG_INFINITY, true)
        } else if self.standby {
            (Score::NEG_INFINITY, false)
        } else {
            (Score::ZERO, false)
        }
    }

    /// A fresh weighted copy.
    #[must_use]
    pub fn copy(&self) -> Node {
        let (weight, fixed) = self.base_weight();
        Node {
            id: self.id,
            weight,
            fixed,
        }
    }

    /// Excluded nodes sort as `-INFINITY` regardless of their copy's weight.
    #[must_use]
    pub fn is_excluded(&self) -> bool {
        self.unclean || self.shutdown || !self.online
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

// =============================================================================
// WEIGHTED COPY
// =============================================================================

/// A weighted copy of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    pub id: NodeId,
    pub weight: Score,
    /// Once set, `weight` is frozen at `-INFINITY`.
    pub fixed: bool,
}

impl Node {
    #[must_use]
    pub const fn new(id: NodeId, weight: Score) -> Self {
        Self {
            id,
            weight,
            fixed: false,
        }
    }

    /// Merge `score` into the weight unless the copy is fixed.
    pub fn adjust(&mut self, score: Score) {
        if !self.fixed {
            self.weight = self.weight.merge(score);
        }
    }

    /// Exclude for cause: `-INFINITY`, frozen.
    pub fn exclude(&mut self) {
        self.weight = Score::NEG_INFINITY;
        self.fixed = true;
    }

    /// Combination of two copies of the same node.
    #[must_use]
    pub fn combine(self, other: Self) -> Self {
        let fixed = self.fixed || other.fixed;
        let weight = if fixed {
            Score::NEG_INFINITY
        } else {
            self.weight.merge(other.weight)
        };
        Self {
            id: self.id,
            weight,
            fixed,
        }
    }

    #[must_use]
    pub fn is_eligible(&self) -> bool {
        !self.weight.is_neg_infinite()
    }
}

// =============================================================================
// NODE LIST
// =============================================================================

/// Weighted node copies keyed by node, iterated in node order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeList(BTreeMap<NodeId, Node>);

impl NodeList {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.0.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.0.get_mut(&id)
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.0.contains_key(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.0.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.0.keys().copied()
    }

    pub fn insert(&mut self, node: Node) {
        self.0.insert(node.id, node);
    }

    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        self.0.remove(&id)
    }

    /// Add `node`, or combine with the copy already present.
    pub fn merge_node(&mut self, node: Node) {
        match self.0.get_mut(&node.id) {
            Some(existing) => *existing = existing.combine(node),
            None => {
                self.0.insert(node.id, node);
            }
        }
    }

    /// Nodes present in both lists, weights merged.
    #[must_use]
    pub fn and(&self, other: &Self) -> Self {
        Self(
            self.0
                .iter()
                .filter_map(|(id, a)| other.0.get(id).map(|b| (*id, a.combine(*b))))
                .collect(),
        )
    }

    /// Nodes present in either list, weights merged where both have them.
    #[must_use]
    pub fn or(&self, other: &Self) -> Self {
        let mut result = self.clone();
        for node in other.0.values() {
            result.merge_node(*node);
        }
        result
    }

    /// Nodes of `self` absent from `other`.
    #[must_use]
    pub fn minus(&self, other: &Self) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(id, _)| !other.0.contains_key(id))
                .map(|(id, n)| (*id, *n))
                .collect(),
        )
    }

    /// Copies that are not `-INFINITY`.
    #[must_use]
    pub fn eligible(&self) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(_, n)| n.is_eligible())
                .map(|(id, n)| (*id, *n))
                .collect(),
        )
    }

    /// Keep only `id`, if present.
    pub fn restrict_to(&mut self, id: NodeId) {
        self.0.retain(|k, _| *k == id);
    }
}

impl FromIterator<Node> for NodeList {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        let mut list = Self::new();
        for node in iter {
            list.merge_node(node);
        }
        list
    }
}

// =============================================================================
// TESTS
// =============================================================================
