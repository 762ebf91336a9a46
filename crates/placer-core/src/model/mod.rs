//! # Cluster Model
//!
//! The per-pass snapshot of nodes, resources and constraints, stored as
//! arenas addressed by [`NodeId`] and [`ResourceId`]. One model is owned by
//! exactly one pass.
//!
//! ## Layout
//!
//! - `node` - shared node details, weighted copies, node lists
//! - `resource` - resources, variants, operation definitions, colocations
//! - `constraint` - location rules, location pins, orderings
//! - `build` - [`ModelBuilder`], snapshot to model

mod build;
pub mod constraint;
pub mod node;
pub mod resource;

pub use build::ModelBuilder;
pub use constraint::{
    ActionRef, Expression, LocationConstraint, LocationRule, OrderingConstraint, Rule, RuleScore,
};
pub use node::{Node, NodeDetails, NodeList};
pub use resource::{AgentId, Colocation, OpDefinition, Resource, ResourceKind};

use crate::config::ClusterOptions;
use crate::input::ResourceHistorySpec;
use crate::types::{ColocationStrength, NodeId, OrderKind, ResourceId};
use std::collections::BTreeMap;

/// Nodes, resources and constraints of one pass.
#[derive(Debug, Clone, Default)]
pub struct ClusterModel {
    pub options: ClusterOptions,
    pub nodes: Vec<NodeDetails>,
    pub resources: Vec<Resource>,
    pub rules: Vec<LocationRule>,
    /// Location constraints produced outside the rule engine (failure pins).
    pub locations: Vec<LocationConstraint>,
    pub orderings: Vec<OrderingConstraint>,
    /// Operation history, replayed before placement.
    pub history: Vec<ResourceHistorySpec>,
    node_index: BTreeMap<String, NodeId>,
    resource_index: BTreeMap<String, ResourceId>,
    next_order_id: u64,
}

impl ClusterModel {
    #[must_use]
    pub fn new(options: ClusterOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    // -------------------------------------------------------------------------
    // Nodes
    // -------------------------------------------------------------------------

    /// Register a node; its `id` field is overwritten with the arena index.
    pub fn add_node(&mut self, mut details: NodeDetails) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        details.id = id;
        self.node_index.insert(details.uuid.clone(), id);
        self.node_index.entry(details.name.clone()).or_insert(id);
        self.nodes.push(details);
        id
    }

    /// Look a node up by id or name.
    #[must_use]
    pub fn find_node(&self, key: &str) -> Option<NodeId> {
        self.node_index.get(key).copied()
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &NodeDetails {
        &self.nodes[id.index()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut NodeDetails {
        &mut self.nodes[id.index()]
    }

    /// Fresh weighted copies of every node.
    #[must_use]
    pub fn all_nodes(&self) -> NodeList {
        self.nodes.iter().map(NodeDetails::copy).collect()
    }

    // -------------------------------------------------------------------------
    // Resources
    // -------------------------------------------------------------------------

    /// Register a resource; its `id` field is overwritten with the arena index.
    pub fn add_resource(&mut self, mut resource: Resource) -> ResourceId {
        let id = ResourceId(self.resources.len() as u32);
        resource.id = id;
        self.resource_index.insert(resource.name.clone(), id);
        self.resources.push(resource);
        id
    }

    #[must_use]
    pub fn find_resource(&self, name: &str) -> Option<ResourceId> {
        self.resource_index.get(name).copied()
    }

    #[must_use]
    pub fn resource(&self, id: ResourceId) -> &Resource {
        &self.resources[id.index()]
    }

    pub fn resource_mut(&mut self, id: ResourceId) -> &mut Resource {
        &mut self.resources[id.index()]
    }

    /// Primitive resources in registration order.
    #[must_use]
    pub fn primitives(&self) -> Vec<ResourceId> {
        self.resources
            .iter()
            .filter(|r| r.is_primitive())
            .map(|r| r.id)
            .collect()
    }

    #[must_use]
    pub fn containers(&self) -> Vec<ResourceId> {
        self.resources
            .iter()
            .filter(|r| !r.is_primitive())
            .map(|r| r.id)
            .collect()
    }

    // -------------------------------------------------------------------------
    // Constraints
    // -------------------------------------------------------------------------

    /// Register a colocation on `rsc` and its inverse on `with`.
    pub fn add_colocation(
        &mut self,
        id: &str,
        rsc: ResourceId,
        with: ResourceId,
        strength: ColocationStrength,
    ) {
        self.resource_mut(rsc).add_colocation(Colocation {
            id: id.to_string(),
            with,
            strength,
        });
        self.resource_mut(with).add_colocation(Colocation {
            id: id.to_string(),
            with: rsc,
            strength,
        });
    }

    /// Register an ordering and return its id.
    pub fn add_ordering(
        &mut self,
        name: impl Into<String>,
        first: ActionRef,
        then: ActionRef,
        kind: OrderKind,
    ) -> u64 {
        let id = self.next_order_id;
        self.next_order_id = self.next_order_id.saturating_add(1);
        self.orderings.push(OrderingConstraint {
            id,
            name: name.into(),
            first,
            then,
            kind,
        });
        id
    }
}

// =============================================================================
// TESTS
// =============================================================================
