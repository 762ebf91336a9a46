//! Resources and their variants.

use super::node::NodeList;
use crate::input::OpSpec;
use crate::primitives::DEFAULT_OP_TIMEOUT_MS;
use crate::score::Score;
use crate::types::{
    ActionId, ColocationStrength, ColorId, Needs, NodeId, OnFail, RecoveryPolicy, ResourceId,
    RestartPolicy, Role, StopFailurePolicy, Task,
};
use std::collections::{BTreeMap, BTreeSet};

/// Resource agent identity: class, type and provider.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct AgentId {
    pub class: String,
    pub agent: String,
    pub provider: Option<String>,
}

/// Resource variant.
///
/// Only primitives are placed and act on nodes. Containers own pseudo
/// actions that bracket their members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    Primitive,
    Group {
        children: Vec<ResourceId>,
    },
    Clone {
        instances: Vec<ResourceId>,
        unique: bool,
    },
}

/// Operation definition, with defaults resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpDefinition {
    pub task: Task,
    pub interval_ms: u64,
    pub timeout_ms: u64,
    pub prereq: Option<Needs>,
    pub on_fail: Option<OnFail>,
    pub role_after_failure: Option<Role>,
    pub role: Option<Role>,
}

impl From<&OpSpec> for OpDefinition {
    fn from(spec: &OpSpec) -> Self {
        Self {
            task: spec.name,
            interval_ms: spec.interval_ms,
            timeout_ms: spec.timeout_ms.unwrap_or(DEFAULT_OP_TIMEOUT_MS),
            prereq: spec.prereq,
            on_fail: spec.on_fail,
            role_after_failure: spec.role_after_failure,
            role: spec.role,
        }
    }
}

/// One side of a colocation, stored on the resource that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Colocation {
    pub id: String,
    pub with: ResourceId,
    pub strength: ColocationStrength,
}

/// A resource and its per-pass state.
#[derive(Debug, Clone)]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
    pub kind: ResourceKind,
    pub parent: Option<ResourceId>,
    pub agent: AgentId,
    pub recovery: RecoveryPolicy,
    pub stop_failure: Option<StopFailurePolicy>,
    pub restart: RestartPolicy,
    pub priority: i64,
    pub stickiness: Score,
    /// Role to reach when placed.
    pub target_role: Role,
    pub params: BTreeMap<String, String>,
    pub operations: Vec<OpDefinition>,

    // -- replayed state ------------------------------------------------------
    /// Highest role found across nodes.
    pub role: Role,
    /// Role after this pass.
    pub next_role: Role,
    pub role_on: BTreeMap<NodeId, Role>,
    pub running_on: BTreeSet<NodeId>,
    /// Nodes where the resource must be stopped and started again.
    pub restart_on: BTreeSet<NodeId>,
    pub is_managed: bool,
    pub orphan: bool,
    pub failed: bool,
    pub unique: bool,
    /// Nodes with a start still in flight.
    pub start_pending: BTreeSet<NodeId>,
    /// Placement is suppressed: the resource stays stopped.
    pub pinned_stopped: bool,

    // -- allocation ----------------------------------------------------------
    pub colocations: Vec<Colocation>,
    pub allowed: NodeList,
    pub color: Option<ColorId>,
    pub allocated: bool,
    pub assigned: Option<NodeId>,

    pub actions: Vec<ActionId>,
}

impl Resource {
    /// A primitive with defaults for every pass field.
    #[must_use]
    pub fn primitive(id: ResourceId, name: impl Into<String>, agent: AgentId) -> Self {
        Self {
            id,
            name: name.into(),
            kind: ResourceKind::Primitive,
            parent: None,
            agent,
            recovery: RecoveryPolicy::StopStart,
            stop_failure: None,
            restart: RestartPolicy::Ignore,
            priority: 0,
            stickiness: Score::ZERO,
            target_role: Role::Started,
            params: BTreeMap::new(),
            operations: Vec::new(),
            role: Role::Stopped,
            next_role: Role::Started,
            role_on: BTreeMap::new(),
            running_on: BTreeSet::new(),
            restart_on: BTreeSet::new(),
            is_managed: true,
            orphan: false,
            failed: false,
            unique: true,
            start_pending: BTreeSet::new(),
            pinned_stopped: false,
            colocations: Vec::new(),
            allowed: NodeList::new(),
            color: None,
            allocated: false,
            assigned: None,
            actions: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_primitive(&self) -> bool {
        matches!(self.kind, ResourceKind::Primitive)
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.running_on.is_empty()
    }

    /// Members of a container, empty for primitives.
    #[must_use]
    pub fn members(&self) -> &[ResourceId] {
        match &self.kind {
            ResourceKind::Primitive => &[],
            ResourceKind::Group { children } => children,
            ResourceKind::Clone { instances, .. } => instances,
        }
    }

    #[must_use]
    pub fn find_op(&self, task: Task, interval_ms: u64) -> Option<&OpDefinition> {
        self.operations
            .iter()
            .find(|op| op.task == task && op.interval_ms == interval_ms)
    }

    /// Recurring monitors that apply when the resource holds `role`.
    pub fn recurring_monitors(&self, role: Role) -> impl Iterator<Item = &OpDefinition> {
        self.operations.iter().filter(move |op| {
            op.task == Task::Monitor
                && op.interval_ms > 0
                && op.role.is_none_or(|r| r == role)
        })
    }

    /// Insert a colocation, keeping the list in processing order.
    pub fn add_colocation(&mut self, colocation: Colocation) {
        self.colocations.push(colocation);
        self.colocations.sort_by_key(|c| c.strength);
    }
}

// =============================================================================
// TESTS
// =============================================================================
