//! Snapshot to model.
//!
//! Resolves every name in the snapshot to an arena handle. Anything that does
//! not resolve is a configuration error: it is recorded and skipped, and the
//! rest of the snapshot is still built.

use super::constraint::{ActionRef, Expression, LocationRule, Rule, RuleScore};
use super::node::NodeDetails;
use super::resource::{AgentId, OpDefinition, Resource, ResourceKind};
use super::ClusterModel;
use crate::config::ClusterOptions;
use crate::context::Diagnostics;
use crate::input::{
    BoolOp, ClusterSnapshot, ColocationSpec, ExprOp, ExpressionSpec, LocationSpec, OrderingSpec,
    PrimitiveSpec, ResourceSpec, RuleSpec, ValueType,
};
use crate::primitives::{ATTR_ID, ATTR_IS_DC, ATTR_UNAME};
use crate::score::Score;
use crate::types::{ColocationStrength, OrderKind, ResourceId, RestartPolicy, Role, Task};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Builds a [`ClusterModel`] from a [`ClusterSnapshot`].
pub struct ModelBuilder;

impl ModelBuilder {
    /// Build the model. Never fails; problems land in `diag`.
    pub fn build(
        snapshot: &ClusterSnapshot,
        options: ClusterOptions,
        diag: &mut Diagnostics,
    ) -> ClusterModel {
        let mut model = ClusterModel::new(options);

        Self::add_nodes(&mut model, snapshot, diag);
        for spec in &snapshot.resources {
            Self::add_resource(&mut model, spec, diag);
        }
        for spec in &snapshot.constraints.colocations {
            Self::add_colocation(&mut model, spec, diag);
        }
        for spec in &snapshot.constraints.locations {
            Self::add_location(&mut model, spec, diag);
        }
        for spec in &snapshot.constraints.orderings {
            Self::add_ordering(&mut model, spec, diag);
        }
        model.history = snapshot.history.clone();

        info!(
            nodes = model.nodes.len(),
            resources = model.resources.len(),
            rules = model.rules.len(),
            orderings = model.orderings.len(),
            "cluster model built"
        );
        model
    }

    // =========================================================================
    // NODES
    // =========================================================================

    fn add_nodes(model: &mut ClusterModel, snapshot: &ClusterSnapshot, diag: &mut Diagnostics) {
        let stonith = model.options.stonith_enabled;
        let dc = model.options.dc_node.clone();

        for spec in &snapshot.nodes {
            if model.find_node(&spec.id).is_some() {
                diag.config_error(format!("duplicate node id '{}'", spec.id));
                continue;
            }
            let name = spec.name.clone().unwrap_or_else(|| spec.id.clone());
            let is_dc = dc.as_deref().is_some_and(|d| d == spec.id || d == name);

            let mut attributes = spec.attributes.clone();
            attributes.insert(ATTR_UNAME.to_string(), name.clone());
            attributes.insert(ATTR_ID.to_string(), spec.id.clone());
            attributes.insert(ATTR_IS_DC.to_string(), is_dc.to_string());
            let standby = attributes
                .get("standby")
                .is_some_and(|v| matches!(v.as_str(), "true" | "on" | "yes" | "1"));

            // Unseen nodes cannot be assumed down unless they can be fenced.
            model.add_node(NodeDetails {
                id: crate::types::NodeId(0),
                uuid: spec.id.clone(),
                name,
                kind: spec.kind,
                online: false,
                unclean: stonith,
                shutdown: false,
                standby,
                attributes,
                num_resources: 0,
                running: BTreeSet::new(),
            });
        }

        for status in &snapshot.status {
            let Some(id) = model.find_node(&status.node) else {
                diag.config_warning(format!("status for unknown node '{}'", status.node));
                continue;
            };
            let node = model.node_mut(id);
            node.online = status.online;
            node.unclean = status.unclean;
            node.shutdown = status.shutdown;
            node.standby |= status.standby;
            debug!(
                node = %node.name,
                online = node.online,
                unclean = node.unclean,
                shutdown = node.shutdown,
                standby = node.standby,
                "node status"
            );
        }
    }

    // =========================================================================
    // RESOURCES
    // =========================================================================

    fn add_resource(model: &mut ClusterModel, spec: &ResourceSpec, diag: &mut Diagnostics) {
        if model.find_resource(spec.id()).is_some() {
            diag.config_error(format!("duplicate resource id '{}'", spec.id()));
            return;
        }
        match spec {
            ResourceSpec::Primitive(p) => {
                Self::add_primitive(model, p, p.id.clone(), None, p.priority, diag);
            }
            ResourceSpec::Group(g) => {
                let container = Self::container(&g.id, g.priority, model);
                let group = model.add_resource(container);
                let mut children = Vec::new();
                for child in &g.children {
                    if let Some(id) =
                        Self::add_primitive(model, child, child.id.clone(), Some(group), g.priority, diag)
                    {
                        children.push(id);
                    }
                }
                for pair in children.windows(2) {
                    let (prev, next) = (pair[0], pair[1]);
                    let name = format!("{}-{}", g.id, model.resource(next).name);
                    model.add_colocation(&name, next, prev, ColocationStrength::Must);
                    model.add_ordering(
                        name.clone(),
                        task_ref(prev, Task::Start),
                        task_ref(next, Task::Start),
                        OrderKind::Mandatory,
                    );
                    model.add_ordering(
                        name,
                        task_ref(next, Task::Stop),
                        task_ref(prev, Task::Stop),
                        OrderKind::Optional,
                    );
                }
                for &child in &children {
                    Self::bracket(model, group, child);
                }
                model.resource_mut(group).kind = ResourceKind::Group { children };
            }
            ResourceSpec::Clone(c) => {
                let container = Self::container(&c.id, c.priority, model);
                let clone = model.add_resource(container);
                let mut instances = Vec::new();
                for i in 0..c.clone_max {
                    let name = format!("{}:{}", c.id, i);
                    if let Some(id) =
                        Self::add_primitive(model, &c.template, name, Some(clone), c.priority, diag)
                    {
                        model.resource_mut(id).unique = c.unique;
                        instances.push(id);
                    }
                }
                for (i, &a) in instances.iter().enumerate() {
                    for &b in &instances[i + 1..] {
                        let name = format!("{}-anti-{}-{}", c.id, a.0, b.0);
                        model.add_colocation(&name, a, b, ColocationStrength::MustNot);
                    }
                    Self::bracket(model, clone, a);
                }
                model.resource_mut(clone).kind = ResourceKind::Clone {
                    instances,
                    unique: c.unique,
                };
            }
        }
    }

    fn add_primitive(
        model: &mut ClusterModel,
        spec: &PrimitiveSpec,
        name: String,
        parent: Option<ResourceId>,
        priority: i64,
        diag: &mut Diagnostics,
    ) -> Option<ResourceId> {
        if model.find_resource(&name).is_some() {
            diag.config_error(format!("duplicate resource id '{}'", name));
            return None;
        }
        let agent = AgentId {
            class: spec.class.clone(),
            agent: spec.agent.clone(),
            provider: spec.provider.clone(),
        };
        let mut rsc = Resource::primitive(ResourceId(0), name, agent);
        rsc.parent = parent;
        rsc.recovery = spec.recovery;
        rsc.stop_failure = spec.stop_failure;
        rsc.restart = spec.restart;
        rsc.priority = priority;
        rsc.is_managed = spec.is_managed.unwrap_or(model.options.is_managed_default);
        rsc.stickiness = spec
            .stickiness
            .unwrap_or(model.options.default_resource_stickiness);
        rsc.target_role = spec.target_role.unwrap_or(Role::Started);
        rsc.next_role = rsc.target_role;
        rsc.params = spec.params.clone();
        rsc.operations = spec.operations.iter().map(OpDefinition::from).collect();
        Some(model.add_resource(rsc))
    }

    fn container(name: &str, priority: i64, model: &ClusterModel) -> Resource {
        let mut rsc = Resource::primitive(
            ResourceId(0),
            name,
            AgentId {
                class: "container".to_string(),
                agent: String::new(),
                provider: None,
            },
        );
        rsc.priority = priority;
        rsc.is_managed = model.options.is_managed_default;
        // Replaced once the members are known.
        rsc.kind = ResourceKind::Group {
            children: Vec::new(),
        };
        rsc
    }

    /// Container start/stop pseudo actions bracket each member.
    fn bracket(model: &mut ClusterModel, container: ResourceId, member: ResourceId) {
        let name = format!(
            "{}-{}",
            model.resource(container).name,
            model.resource(member).name
        );
        let pairs = [
            (task_ref(container, Task::Start), task_ref(member, Task::Start)),
            (task_ref(member, Task::Start), task_ref(container, Task::Running)),
            (task_ref(container, Task::Stop), task_ref(member, Task::Stop)),
            (task_ref(member, Task::Stop), task_ref(container, Task::Stopped)),
        ];
        for (first, then) in pairs {
            model.add_ordering(name.clone(), first, then, OrderKind::Optional);
        }
    }

    // =========================================================================
    // COLOCATIONS
    // =========================================================================

    fn add_colocation(model: &mut ClusterModel, spec: &ColocationSpec, diag: &mut Diagnostics) {
        let Some(id) = spec.id.as_deref() else {
            diag.config_error(format!(
                "colocation {} with {} must have an id",
                spec.resource, spec.with
            ));
            return;
        };
        let Some(rsc) = Self::placeable(model, id, &spec.resource, diag) else {
            return;
        };
        let Some(with) = Self::placeable(model, id, &spec.with, diag) else {
            return;
        };
        if rsc == with {
            diag.config_error(format!("colocation {} links {} with itself", id, spec.resource));
            return;
        }
        debug!(id, rsc = %spec.resource, with = %spec.with, strength = ?spec.strength, "colocation");
        model.add_colocation(id, rsc, with, spec.strength);
    }

    /// The primitive that stands for `name` in a colocation.
    fn placeable(
        model: &ClusterModel,
        constraint: &str,
        name: &str,
        diag: &mut Diagnostics,
    ) -> Option<ResourceId> {
        let Some(id) = model.find_resource(name) else {
            diag.config_error(format!("constraint {}: no resource named '{}'", constraint, name));
            return None;
        };
        match &model.resource(id).kind {
            ResourceKind::Primitive => Some(id),
            ResourceKind::Group { children } => {
                let first = children.first().copied();
                if first.is_none() {
                    diag.config_error(format!("constraint {}: group '{}' is empty", constraint, name));
                }
                first
            }
            ResourceKind::Clone { .. } => {
                diag.config_error(format!(
                    "constraint {}: colocation with clone '{}' is not supported",
                    constraint, name
                ));
                None
            }
        }
    }

    // =========================================================================
    // LOCATIONS
    // =========================================================================

    fn add_location(model: &mut ClusterModel, spec: &LocationSpec, diag: &mut Diagnostics) {
        let Some(id) = spec.id.clone() else {
            diag.config_error(format!("location for {} must have an id", spec.resource));
            return;
        };
        let Some(rsc) = model.find_resource(&spec.resource) else {
            diag.config_error(format!("location {}: no resource named '{}'", id, spec.resource));
            return;
        };
        if !model.resource(rsc).is_managed {
            info!(id = %id, rsc = %spec.resource, "ignoring location for unmanaged resource");
            return;
        }
        let targets: Vec<ResourceId> = match model.resource(rsc).members() {
            [] if model.resource(rsc).is_primitive() => vec![rsc],
            members => members.to_vec(),
        };

        let mut rules = Vec::new();
        if let Some(node) = &spec.node {
            let Some(node_id) = model.find_node(node) else {
                diag.config_error(format!("location {}: no node named '{}'", id, node));
                return;
            };
            rules.push((
                None,
                Rule {
                    id: id.clone(),
                    score: RuleScore::Literal(spec.score.unwrap_or(Score::ZERO)),
                    op: BoolOp::And,
                    expressions: vec![Expression::Compare {
                        attribute: ATTR_UNAME.to_string(),
                        op: ExprOp::Eq,
                        value: Some(model.node(node_id).name.clone()),
                        value_type: ValueType::String,
                    }],
                },
            ));
        }
        for (k, rule) in spec.rules.iter().enumerate() {
            let rule_id = rule.id.clone().unwrap_or_else(|| format!("{}-rule-{}", id, k));
            let role = match rule.role.as_deref().map(str::parse::<Role>).transpose() {
                Ok(role) => role,
                Err(e) => {
                    diag.config_error(format!("rule {}: {}", rule_id, e));
                    continue;
                }
            };
            rules.push((role, Self::convert_rule(rule, rule_id)));
        }
        if rules.is_empty() {
            diag.config_error(format!("location {} has neither a node nor rules", id));
            return;
        }

        for target in targets {
            for (role, rule) in &rules {
                model.rules.push(LocationRule {
                    id: id.clone(),
                    resource: target,
                    role: *role,
                    rule: rule.clone(),
                });
            }
        }
    }

    fn convert_rule(spec: &RuleSpec, id: String) -> Rule {
        let score = match &spec.score_attribute {
            Some(attr) => RuleScore::Attribute(attr.clone()),
            None => RuleScore::Literal(spec.score.unwrap_or(Score::ZERO)),
        };
        let expressions = spec
            .expressions
            .iter()
            .enumerate()
            .map(|(k, expr)| match expr {
                ExpressionSpec::Attribute {
                    attribute,
                    operation,
                    value,
                    value_type,
                } => Expression::Compare {
                    attribute: attribute.clone(),
                    op: *operation,
                    value: value.clone(),
                    value_type: *value_type,
                },
                ExpressionSpec::Rule(nested) => {
                    let nested_id = nested.id.clone().unwrap_or_else(|| format!("{}-{}", id, k));
                    Expression::Nested(Self::convert_rule(nested, nested_id))
                }
            })
            .collect();
        Rule {
            id,
            score,
            op: spec.boolean_op,
            expressions,
        }
    }

    // =========================================================================
    // ORDERINGS
    // =========================================================================

    fn add_ordering(model: &mut ClusterModel, spec: &OrderingSpec, diag: &mut Diagnostics) {
        let Some(id) = spec.id.clone() else {
            diag.config_error(format!(
                "ordering {} then {} must have an id",
                spec.first, spec.then
            ));
            return;
        };
        let Some(first) = model.find_resource(&spec.first) else {
            diag.config_error(format!("ordering {}: no resource named '{}'", id, spec.first));
            return;
        };
        let Some(then) = model.find_resource(&spec.then) else {
            diag.config_error(format!("ordering {}: no resource named '{}'", id, spec.then));
            return;
        };
        let first_task = spec.first_action.unwrap_or(Task::Start);
        let then_task = spec.then_action.unwrap_or(first_task);

        Self::push_ordering(model, &id, (first, first_task), (then, then_task), spec.kind);

        if !spec.symmetrical {
            return;
        }
        if !first_task.is_reversible() || !then_task.is_reversible() {
            diag.config_warning(format!(
                "ordering {}: {} / {} cannot be inverted, keeping one direction",
                id, first_task, then_task
            ));
            return;
        }
        let inverse = format!("{}-inverse", id);
        Self::push_ordering(
            model,
            &inverse,
            (then, then_task.invert()),
            (first, first_task.invert()),
            spec.kind,
        );
    }

    /// Register `first.task -> then.task`, plus the recover pair when `then`
    /// restarts with its dependency.
    fn push_ordering(
        model: &mut ClusterModel,
        name: &str,
        (first, first_task): (ResourceId, Task),
        (then, then_task): (ResourceId, Task),
        kind: OrderKind,
    ) {
        let first_ref = |model: &ClusterModel, task: Task| {
            if model.resource(first).is_primitive() {
                task_ref(first, task)
            } else {
                task_ref(first, task.completion())
            }
        };
        let lhs = first_ref(model, first_task);
        model.add_ordering(name, lhs, task_ref(then, then_task), kind);

        let restarts = model.resource(then).restart == RestartPolicy::Restart;
        if restarts && first_task == then_task && matches!(first_task, Task::Start | Task::Stop) {
            debug!(name, task = %first_task, "recover ordering");
            let lhs = first_ref(model, first_task);
            model.add_ordering(
                format!("{}-recover", name),
                lhs,
                task_ref(then, then_task),
                OrderKind::Recover,
            );
        }
    }
}

fn task_ref(resource: ResourceId, task: Task) -> ActionRef {
    ActionRef::Task { resource, task }
}

// =============================================================================
// TESTS
// =============================================================================
