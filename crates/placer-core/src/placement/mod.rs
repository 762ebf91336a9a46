//! # Placement Constraint Engine
//!
//! Turns location rules, failure pins and stickiness into one weighted
//! candidate list per primitive resource.
//!
//! ## Candidate list
//!
//! 1. Symmetric clusters start from every node at its base weight; asymmetric
//!    clusters start empty and only admit nodes a non-negative constraint names.
//! 2. Every applicable location constraint is merged in.
//! 3. Stickiness is added on the nodes the resource already runs on.
//!
//! Orphans (when orphan stopping is on), resources whose target role is
//! stopped and resources pinned stopped by a failure get an empty list.
//! Unmanaged resources stay where they are.

pub mod rules;

pub use rules::RuleEvaluator;

use crate::context::{Diagnostics, SchedulingContext};
use crate::model::{ClusterModel, LocationConstraint, NodeList, Resource};
use crate::score::Score;
use crate::types::{ResourceId, Role};
use std::collections::BTreeMap;
use tracing::debug;

/// Computes candidate node lists.
pub struct PlacementEngine;

impl PlacementEngine {
    /// Compute and store every primitive's candidate list.
    pub fn apply(ctx: &mut SchedulingContext) {
        let candidates = Self::candidates(&ctx.model, &mut ctx.diagnostics);
        for (rsc, allowed) in candidates {
            ctx.model.resource_mut(rsc).allowed = allowed;
        }
    }

    /// Candidate lists for every primitive. Reads the model only.
    pub fn candidates(
        model: &ClusterModel,
        diag: &mut Diagnostics,
    ) -> BTreeMap<ResourceId, NodeList> {
        let mut evaluated: BTreeMap<ResourceId, Vec<LocationConstraint>> = BTreeMap::new();
        for rule in &model.rules {
            let rsc = model.resource(rule.resource);
            if rule.role.is_some_and(|role| role != rsc.next_role) {
                debug!(rule = %rule.id, rsc = %rsc.name, "role filter excludes rule");
                continue;
            }
            if let Some(nodes) = RuleEvaluator::evaluate(&rule.rule, model, diag) {
                evaluated.entry(rule.resource).or_default().push(LocationConstraint {
                    id: rule.id.clone(),
                    resource: rule.resource,
                    role: rule.role,
                    nodes,
                });
            }
        }

        model
            .primitives()
            .into_iter()
            .map(|id| {
                let rsc = model.resource(id);
                let from_rules = evaluated.get(&id).map(Vec::as_slice).unwrap_or_default();
                (id, Self::candidates_for(model, rsc, from_rules))
            })
            .collect()
    }

    fn candidates_for(
        model: &ClusterModel,
        rsc: &Resource,
        from_rules: &[LocationConstraint],
    ) -> NodeList {
        let opts = &model.options;
        if (rsc.orphan && opts.stop_orphan_resources)
            || rsc.pinned_stopped
            || rsc.next_role == Role::Stopped
        {
            debug!(rsc = %rsc.name, "no candidates: orphan or stopped");
            return NodeList::new();
        }
        if !rsc.is_managed {
            return rsc
                .running_on
                .iter()
                .map(|&n| {
                    let mut node = model.node(n).copy();
                    node.adjust(Score::INFINITY);
                    node
                })
                .collect();
        }

        let mut allowed = if opts.symmetric_cluster {
            model.all_nodes()
        } else {
            NodeList::new()
        };

        let pins = model.locations.iter().filter(|l| l.resource == rsc.id);
        for constraint in from_rules.iter().chain(pins) {
            Self::apply_location(model, &mut allowed, constraint);
        }

        for &n in &rsc.running_on {
            if let Some(node) = allowed.get_mut(n) {
                node.adjust(rsc.stickiness);
            }
        }

        debug!(
            rsc = %rsc.name,
            candidates = allowed.eligible().len(),
            "candidate list computed"
        );
        allowed
    }

    /// Merge one location constraint into a candidate list.
    fn apply_location(model: &ClusterModel, allowed: &mut NodeList, constraint: &LocationConstraint) {
        for wanted in constraint.nodes.iter() {
            if let Some(node) = allowed.get_mut(wanted.id) {
                node.adjust(wanted.weight);
                if wanted.fixed {
                    node.exclude();
                }
            } else if model.options.symmetric_cluster || wanted.weight >= Score::ZERO {
                let mut node = model.node(wanted.id).copy();
                node.adjust(wanted.weight);
                allowed.insert(node);
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClusterOptions;
    use crate::input::{BoolOp, ExprOp, NodeKind, ValueType};
    use crate::model::{AgentId, Expression, LocationRule, NodeDetails, Rule, RuleScore};
    use crate::types::NodeId;
    use std::collections::BTreeSet;

    fn model(symmetric: bool) -> ClusterModel {
        let mut model = ClusterModel::new(ClusterOptions {
            symmetric_cluster: symmetric,
            ..Default::default()
        });
        for name in ["n0", "n1", "n2"] {
            let mut attributes = BTreeMap::new();
            attributes.insert("#uname".to_string(), name.to_string());
            model.add_node(NodeDetails {
                id: NodeId(0),
                uuid: name.to_string(),
                name: name.to_string(),
                kind: NodeKind::Member,
                online: true,
                unclean: false,
                shutdown: false,
                standby: false,
                attributes,
                num_resources: 0,
                running: BTreeSet::new(),
            });
        }
        model.add_resource(Resource::primitive(
            ResourceId(0),
            "r",
            AgentId {
                class: "ocf".to_string(),
                agent: "Dummy".to_string(),
                provider: None,
            },
        ));
        model
    }

    fn prefer(model: &mut ClusterModel, node: &str, score: Score, role: Option<Role>) {
        model.rules.push(LocationRule {
            id: format!("prefer-{}", node),
            resource: ResourceId(0),
            role,
            rule: Rule {
                id: format!("prefer-{}", node),
                score: RuleScore::Literal(score),
                op: BoolOp::And,
                expressions: vec![Expression::Compare {
                    attribute: "#uname".to_string(),
                    op: ExprOp::Eq,
                    value: Some(node.to_string()),
                    value_type: ValueType::String,
                }],
            },
        });
    }

    #[test]
    fn symmetric_cluster_starts_from_all_nodes() {
        let mut m = model(true);
        prefer(&mut m, "n1", Score::new(100), None);
        let mut diag = Diagnostics::default();
        let lists = PlacementEngine::candidates(&m, &mut diag);
        let list = &lists[&ResourceId(0)];
        assert_eq!(list.len(), 3);
        assert_eq!(list.get(NodeId(1)).expect("n1").weight.value(), 100);
        assert_eq!(list.get(NodeId(0)).expect("n0").weight, Score::ZERO);
    }

    #[test]
    fn asymmetric_cluster_admits_only_positive_constraints() {
        let mut m = model(false);
        prefer(&mut m, "n1", Score::new(10), None);
        prefer(&mut m, "n2", Score::new(-10), None);
        let mut diag = Diagnostics::default();
        let lists = PlacementEngine::candidates(&m, &mut diag);
        let list = &lists[&ResourceId(0)];
        assert_eq!(list.ids().collect::<Vec<_>>(), vec![NodeId(1)]);
    }

    #[test]
    fn role_filter_skips_rule() {
        let mut m = model(true);
        prefer(&mut m, "n1", Score::NEG_INFINITY, Some(Role::Master));
        let mut diag = Diagnostics::default();
        let lists = PlacementEngine::candidates(&m, &mut diag);
        assert!(lists[&ResourceId(0)].get(NodeId(1)).expect("n1").is_eligible());
    }

    #[test]
    fn stickiness_applies_to_current_node() {
        let mut m = model(true);
        let rsc = m.resource_mut(ResourceId(0));
        rsc.stickiness = Score::new(25);
        rsc.running_on.insert(NodeId(2));
        let mut diag = Diagnostics::default();
        let lists = PlacementEngine::candidates(&m, &mut diag);
        assert_eq!(
            lists[&ResourceId(0)].get(NodeId(2)).expect("n2").weight.value(),
            25
        );
    }

    #[test]
    fn orphan_gets_no_candidates() {
        let mut m = model(true);
        m.resource_mut(ResourceId(0)).orphan = true;
        let mut diag = Diagnostics::default();
        let lists = PlacementEngine::candidates(&m, &mut diag);
        assert!(lists[&ResourceId(0)].is_empty());
    }

    #[test]
    fn failure_pin_excludes_node() {
        let mut m = model(true);
        let mut nodes = NodeList::new();
        let mut pin = m.node(NodeId(0)).copy();
        pin.exclude();
        nodes.insert(pin);
        m.locations.push(LocationConstraint {
            id: "failed".to_string(),
            resource: ResourceId(0),
            role: None,
            nodes,
        });
        prefer(&mut m, "n0", Score::INFINITY, None);
        let mut diag = Diagnostics::default();
        let lists = PlacementEngine::candidates(&m, &mut diag);
        assert!(!lists[&ResourceId(0)].get(NodeId(0)).expect("n0").is_eligible());
    }
}
