//! # Snapshot Input
//!
//! The already-parsed cluster description a pass consumes: nodes and their
//! status, resource definitions, constraints, and per-node operation history.
//!
//! Everything here is plain data. Name resolution and validation happen in
//! [`crate::model::ModelBuilder`], where unresolvable entries are reported as
//! configuration errors and skipped.

use crate::config::ClusterOptions;
use crate::score::Score;
use crate::types::{
    ColocationStrength, Needs, OnFail, OpStatus, OrderKind, RecoveryPolicy, RestartPolicy, Role,
    StopFailurePolicy, Task,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// SNAPSHOT
// =============================================================================

/// Complete input of one scheduling pass.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    #[serde(default)]
    pub options: ClusterOptions,
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub resources: Vec<ResourceSpec>,
    #[serde(default)]
    pub constraints: ConstraintSpecs,
    /// Per-node membership status. Nodes without an entry are offline.
    #[serde(default)]
    pub status: Vec<NodeStatusSpec>,
    #[serde(default)]
    pub history: Vec<ResourceHistorySpec>,
}

// =============================================================================
// NODES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    #[default]
    Member,
    Ping,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: String,
    /// Defaults to the id.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: NodeKind,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// Membership status of one node, derived externally.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeStatusSpec {
    pub node: String,
    pub online: bool,
    pub unclean: bool,
    pub shutdown: bool,
    pub standby: bool,
}

// =============================================================================
// RESOURCES
// =============================================================================

/// A resource definition, tagged by variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResourceSpec {
    Primitive(PrimitiveSpec),
    Group(GroupSpec),
    Clone(CloneSpec),
}

impl ResourceSpec {
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Primitive(p) => &p.id,
            Self::Group(g) => &g.id,
            Self::Clone(c) => &c.id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrimitiveSpec {
    pub id: String,
    #[serde(default = "default_class")]
    pub class: String,
    #[serde(rename = "type")]
    pub agent: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub recovery: RecoveryPolicy,
    #[serde(default)]
    pub stop_failure: Option<StopFailurePolicy>,
    #[serde(default)]
    pub restart: RestartPolicy,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub is_managed: Option<bool>,
    #[serde(default)]
    pub stickiness: Option<Score>,
    /// Role the resource should reach when placed. Defaults to `started`.
    #[serde(default)]
    pub target_role: Option<Role>,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default)]
    pub operations: Vec<OpSpec>,
}

fn default_class() -> String {
    "ocf".to_string()
}

/// An ordered list of primitives that start in sequence on one node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupSpec {
    pub id: String,
    #[serde(default)]
    pub priority: i64,
    pub children: Vec<PrimitiveSpec>,
}

/// `clone_max` copies of one primitive, never two on the same node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloneSpec {
    pub id: String,
    #[serde(default)]
    pub priority: i64,
    pub clone_max: u32,
    /// Instances are distinguishable; history is never remapped between them.
    #[serde(default)]
    pub unique: bool,
    pub template: PrimitiveSpec,
}

/// Operation definition on a resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpSpec {
    pub name: Task,
    #[serde(default)]
    pub interval_ms: u64,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub prereq: Option<Needs>,
    #[serde(default)]
    pub on_fail: Option<OnFail>,
    #[serde(default)]
    pub role_after_failure: Option<Role>,
    /// Only schedule this (recurring) operation when the resource has this role.
    #[serde(default)]
    pub role: Option<Role>,
}

// =============================================================================
// CONSTRAINTS
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstraintSpecs {
    pub locations: Vec<LocationSpec>,
    pub colocations: Vec<ColocationSpec>,
    pub orderings: Vec<OrderingSpec>,
}

/// Location constraint: either a single `node` + `score`, or a list of rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationSpec {
    #[serde(default)]
    pub id: Option<String>,
    pub resource: String,
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub score: Option<Score>,
    #[serde(default)]
    pub rules: Vec<RuleSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BoolOp {
    #[default]
    And,
    Or,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSpec {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub score: Option<Score>,
    /// Node attribute whose value is parsed as the score.
    #[serde(default)]
    pub score_attribute: Option<String>,
    /// Role filter, validated when the model is built.
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub boolean_op: BoolOp,
    #[serde(default)]
    pub expressions: Vec<ExpressionSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExprOp {
    Lt,
    Gt,
    Lte,
    Gte,
    Eq,
    Ne,
    Defined,
    NotDefined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    String,
    Integer,
    Version,
}

/// A leaf attribute comparison or a nested rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ExpressionSpec {
    Attribute {
        attribute: String,
        operation: ExprOp,
        #[serde(default)]
        value: Option<String>,
        #[serde(default, rename = "type")]
        value_type: ValueType,
    },
    Rule(RuleSpec),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColocationSpec {
    #[serde(default)]
    pub id: Option<String>,
    pub resource: String,
    pub with: String,
    pub strength: ColocationStrength,
}

/// `first.first_action` runs before `then.then_action`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderingSpec {
    #[serde(default)]
    pub id: Option<String>,
    pub first: String,
    /// Defaults to `start`.
    #[serde(default)]
    pub first_action: Option<Task>,
    pub then: String,
    /// Defaults to `first_action`.
    #[serde(default)]
    pub then_action: Option<Task>,
    #[serde(default)]
    pub kind: OrderKind,
    #[serde(default = "default_symmetrical")]
    pub symmetrical: bool,
}

fn default_symmetrical() -> bool {
    true
}

// =============================================================================
// OPERATION HISTORY
// =============================================================================

/// Operation history of one resource on one node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceHistorySpec {
    pub resource: String,
    pub node: String,
    #[serde(default = "default_class")]
    pub class: String,
    #[serde(rename = "type")]
    pub agent: String,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub ops: Vec<OpRecordSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpRecordSpec {
    pub task: Task,
    #[serde(default)]
    pub interval_ms: u64,
    pub call_id: i64,
    pub status: OpStatus,
    #[serde(default)]
    pub rc: i32,
    #[serde(default)]
    pub target_rc: Option<i32>,
    /// `"<status>:<rc>;<transition-id>:<uuid>"`, set on operations in flight.
    #[serde(default)]
    pub transition_magic: Option<String>,
    /// Instance parameters the operation ran with.
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}
