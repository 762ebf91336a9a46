//! Resolved constraints: location rules, location pins, orderings.
//!
//! Colocations live on the resources themselves (see
//! [`super::resource::Colocation`]).

use super::node::NodeList;
use crate::input::{BoolOp, ExprOp, ValueType};
use crate::score::Score;
use crate::types::{ActionId, OrderKind, ResourceId, Role, Task};

/// Where a rule's score comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleScore {
    Literal(Score),
    /// Parsed from the named node attribute.
    Attribute(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Compare {
        attribute: String,
        op: ExprOp,
        value: Option<String>,
        value_type: ValueType,
    },
    Nested(Rule),
}

/// Boolean combination of expressions, scored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub id: String,
    pub score: RuleScore,
    pub op: BoolOp,
    pub expressions: Vec<Expression>,
}

/// A location rule bound to a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationRule {
    pub id: String,
    pub resource: ResourceId,
    /// Applies only when the resource's next role matches.
    pub role: Option<Role>,
    pub rule: Rule,
}

/// An evaluated location constraint: weighted nodes for one resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationConstraint {
    pub id: String,
    pub resource: ResourceId,
    pub role: Option<Role>,
    pub nodes: NodeList,
}

/// One endpoint of an ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionRef {
    /// Every action of `task` on the resource, on any node.
    Task { resource: ResourceId, task: Task },
    Action(ActionId),
}

/// `first` must complete before `then` may begin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderingConstraint {
    pub id: u64,
    pub name: String,
    pub first: ActionRef,
    pub then: ActionRef,
    pub kind: OrderKind,
}
