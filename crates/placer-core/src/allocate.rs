//! # Coloring Allocator
//!
//! Assigns every primitive resource to at most one node.
//!
//! A *color* is a colocation group: every resource starts in its own color and
//! `must` colocations pull unallocated partners into the color of the resource
//! being processed, intersecting their candidate lists. One node is then
//! chosen for the whole color.
//!
//! ## Order
//!
//! Resources are processed by descending priority; ties keep registration
//! order. A resource whose color was already resolved by a higher-priority
//! peer simply follows it, provided its own candidate list still allows the
//! node.
//!
//! ## Node choice
//!
//! Highest weight first (unclean, shutting-down and offline nodes count as
//! `-INFINITY`), then fewest resources already allocated, then node id. A
//! color whose best node is `-INFINITY` stays unassigned: its resources stop.

use crate::context::SchedulingContext;
use crate::model::{ClusterModel, NodeList};
use crate::score::Score;
use crate::types::{ColocationStrength, ColorId, NodeId, PlacerError, ResourceId};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

// =============================================================================
// COLOR
// =============================================================================

/// Shared record of one color.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorDetails {
    pub id: ColorId,
    /// Merged candidate list of every member.
    pub candidates: NodeList,
    pub chosen: Option<NodeId>,
    /// A node choice (possibly none) has been made.
    pub resolved: bool,
    pub members: BTreeSet<ResourceId>,
}

// =============================================================================
// ALLOCATOR
// =============================================================================

/// The coloring allocator.
pub struct ColoringAllocator;

impl ColoringAllocator {
    /// Allocate every primitive and return the assignment.
    ///
    /// Fails only when a color ends up with two different nodes.
    pub fn allocate(
        ctx: &mut SchedulingContext,
    ) -> Result<BTreeMap<ResourceId, Option<NodeId>>, PlacerError> {
        let mut order = ctx.model.primitives();
        order.sort_by_key(|&id| Reverse(ctx.model.resource(id).priority));

        for rsc in order {
            Self::allocate_one(ctx, rsc);
        }
        Self::verify(ctx)?;

        Ok(ctx
            .model
            .resources
            .iter()
            .filter(|r| r.is_primitive())
            .map(|r| (r.id, r.assigned))
            .collect())
    }

    fn allocate_one(ctx: &mut SchedulingContext, rsc: ResourceId) {
        if ctx.model.resource(rsc).allocated {
            return;
        }
        let color = Self::color_of(ctx, rsc);

        if ctx.color(color).resolved {
            let chosen = ctx.color(color).chosen;
            let accepted = chosen.filter(|&n| {
                ctx.model
                    .resource(rsc)
                    .allowed
                    .get(n)
                    .is_some_and(|node| node.is_eligible())
            });
            if chosen.is_some() && accepted.is_none() {
                debug!(rsc = %ctx.model.resource(rsc).name, "cannot follow colocated peers");
            }
            Self::assign(ctx, rsc, accepted);
            return;
        }

        let merged = Self::merge_partners(ctx, rsc, color);
        let chosen = Self::choose(&ctx.model, &merged);
        let details = ctx.color_mut(color);
        details.candidates = merged;
        details.chosen = chosen;
        details.resolved = true;
        Self::assign(ctx, rsc, chosen);
    }

    /// The resource's color, created from its candidate list on first use.
    fn color_of(ctx: &mut SchedulingContext, rsc: ResourceId) -> ColorId {
        if let Some(color) = ctx.model.resource(rsc).color {
            return color;
        }
        let candidates = ctx.model.resource(rsc).allowed.clone();
        let color = ctx.new_color(ColorDetails {
            candidates,
            members: BTreeSet::from([rsc]),
            ..ColorDetails::default()
        });
        ctx.model.resource_mut(rsc).color = Some(color);
        color
    }

    /// Merge the candidate lists of the color's transitive `must` partners
    /// and apply `must-not` exclusions from partners already placed.
    fn merge_partners(ctx: &mut SchedulingContext, rsc: ResourceId, color: ColorId) -> NodeList {
        let mut merged = ctx.color(color).candidates.clone();
        let mut queue = vec![rsc];

        while let Some(member) = queue.pop() {
            let colocations = ctx.model.resource(member).colocations.clone();
            for colocation in colocations {
                let partner = colocation.with;
                let placed = Self::placement_of(ctx, partner, color);
                match (colocation.strength, placed) {
                    (ColocationStrength::Ignore, _) => {}
                    (ColocationStrength::Must, Some(Some(node))) => merged.restrict_to(node),
                    (ColocationStrength::Must, Some(None)) => {
                        debug!(id = %colocation.id, "must-colocated partner is stopped");
                        merged = NodeList::new();
                    }
                    (ColocationStrength::Must, None) => {
                        if ctx.model.resource(partner).color != Some(color) {
                            merged = merged.and(&ctx.model.resource(partner).allowed);
                            ctx.model.resource_mut(partner).color = Some(color);
                            ctx.color_mut(color).members.insert(partner);
                            queue.push(partner);
                        }
                    }
                    (ColocationStrength::MustNot, Some(Some(node))) => {
                        if let Some(n) = merged.get_mut(node) {
                            n.exclude();
                        }
                    }
                    (ColocationStrength::MustNot, Some(None)) => {}
                    (ColocationStrength::MustNot, None) => {
                        if ctx.model.resource(partner).color == Some(color) {
                            ctx.diagnostics.config_error(format!(
                                "colocation {}: {} must and must not run with {}",
                                colocation.id,
                                ctx.model.resource(member).name,
                                ctx.model.resource(partner).name
                            ));
                            merged = NodeList::new();
                        }
                    }
                }
            }
        }
        merged
    }

    /// Where `partner` is already placed, if anywhere is decided.
    ///
    /// `Some(None)` means decided to stop.
    fn placement_of(
        ctx: &SchedulingContext,
        partner: ResourceId,
        color: ColorId,
    ) -> Option<Option<NodeId>> {
        let rsc = ctx.model.resource(partner);
        if rsc.allocated {
            return Some(rsc.assigned);
        }
        match rsc.color {
            Some(other) if other != color && ctx.color(other).resolved => {
                Some(ctx.color(other).chosen)
            }
            _ => None,
        }
    }

    /// Best eligible node of `list`.
    #[must_use]
    pub fn choose(model: &ClusterModel, list: &NodeList) -> Option<NodeId> {
        list.iter()
            .map(|node| {
                let details = model.node(node.id);
                let weight = if details.is_excluded() {
                    Score::NEG_INFINITY
                } else {
                    node.weight
                };
                (weight, details.num_resources, node.id)
            })
            .filter(|(weight, _, _)| !weight.is_neg_infinite())
            .min_by_key(|&(weight, load, id)| (Reverse(weight), load, id))
            .map(|(_, _, id)| id)
    }

    fn assign(ctx: &mut SchedulingContext, rsc: ResourceId, node: Option<NodeId>) {
        let resource = ctx.model.resource_mut(rsc);
        resource.allocated = true;
        resource.assigned = node;
        let name = resource.name.clone();
        match node {
            Some(n) => {
                let details = ctx.model.node_mut(n);
                details.num_resources = details.num_resources.saturating_add(1);
                info!(rsc = %name, node = %details.name, "resource allocated");
            }
            None => info!(rsc = %name, "resource cannot run anywhere"),
        }
    }

    /// Every member of a color sits on the color's node or on none.
    fn verify(ctx: &SchedulingContext) -> Result<(), PlacerError> {
        for color in &ctx.colors {
            for &member in &color.members {
                let assigned = ctx.model.resource(member).assigned;
                if assigned.is_some() && assigned != color.chosen {
                    return Err(PlacerError::ColorConflict {
                        color: color.id,
                        first: color.chosen,
                        second: assigned,
                    });
                }
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClusterOptions;
    use crate::context::Diagnostics;
    use crate::input::NodeKind;
    use crate::model::{AgentId, Node, NodeDetails, Resource};

    fn context(nodes: usize) -> SchedulingContext {
        let mut model = ClusterModel::new(ClusterOptions::default());
        for i in 0..nodes {
            model.add_node(NodeDetails {
                id: NodeId(0),
                uuid: format!("n{}", i),
                name: format!("n{}", i),
                kind: NodeKind::Member,
                online: true,
                unclean: false,
                shutdown: false,
                standby: false,
                attributes: BTreeMap::new(),
                num_resources: 0,
                running: BTreeSet::new(),
            });
        }
        SchedulingContext::new(model, Diagnostics::default())
    }

    fn add(ctx: &mut SchedulingContext, name: &str, weights: &[(u32, i64)]) -> ResourceId {
        let mut rsc = Resource::primitive(
            ResourceId(0),
            name,
            AgentId {
                class: "ocf".to_string(),
                agent: "Dummy".to_string(),
                provider: None,
            },
        );
        rsc.allowed = weights
            .iter()
            .map(|&(n, w)| Node::new(NodeId(n), Score::new(w)))
            .collect();
        ctx.model.add_resource(rsc)
    }

    #[test]
    fn picks_highest_weight() {
        let mut ctx = context(2);
        let r = add(&mut ctx, "r", &[(0, 100), (1, 50)]);
        let assignment = ColoringAllocator::allocate(&mut ctx).expect("allocate");
        assert_eq!(assignment[&r], Some(NodeId(0)));
    }

    #[test]
    fn ties_break_on_load_then_id() {
        let mut ctx = context(2);
        let a = add(&mut ctx, "a", &[(0, 10), (1, 10)]);
        let b = add(&mut ctx, "b", &[(0, 10), (1, 10)]);
        let assignment = ColoringAllocator::allocate(&mut ctx).expect("allocate");
        assert_eq!(assignment[&a], Some(NodeId(0)));
        assert_eq!(assignment[&b], Some(NodeId(1)));
    }

    #[test]
    fn must_colocation_shares_node() {
        let mut ctx = context(2);
        let r = add(&mut ctx, "r", &[(0, 0), (1, -1_000_000)]);
        let s = add(&mut ctx, "s", &[(0, 0), (1, 500)]);
        ctx.model.add_colocation("c", r, s, ColocationStrength::Must);
        let assignment = ColoringAllocator::allocate(&mut ctx).expect("allocate");
        assert_eq!(assignment[&r], Some(NodeId(0)));
        assert_eq!(assignment[&s], Some(NodeId(0)));
        assert_eq!(ctx.model.resource(r).color, ctx.model.resource(s).color);
    }

    #[test]
    fn must_not_excludes_placed_partner_node() {
        let mut ctx = context(2);
        let r = add(&mut ctx, "r", &[(0, 1_000_000)]);
        let s = add(&mut ctx, "s", &[(0, 100), (1, 0)]);
        ctx.model.add_colocation("c", r, s, ColocationStrength::MustNot);
        let assignment = ColoringAllocator::allocate(&mut ctx).expect("allocate");
        assert_eq!(assignment[&r], Some(NodeId(0)));
        assert_eq!(assignment[&s], Some(NodeId(1)));
    }

    #[test]
    fn must_not_with_no_remaining_node_leaves_unassigned() {
        let mut ctx = context(1);
        let r = add(&mut ctx, "r", &[(0, 1_000_000)]);
        let s = add(&mut ctx, "s", &[(0, 100)]);
        ctx.model.add_colocation("c", r, s, ColocationStrength::MustNot);
        let assignment = ColoringAllocator::allocate(&mut ctx).expect("allocate");
        assert_eq!(assignment[&s], None);
    }

    #[test]
    fn higher_priority_processed_first() {
        let mut ctx = context(1);
        let low = add(&mut ctx, "low", &[(0, 10)]);
        let high = add(&mut ctx, "high", &[(0, 10)]);
        ctx.model.resource_mut(high).priority = 10;
        ctx.model.add_colocation("c", low, high, ColocationStrength::MustNot);
        let assignment = ColoringAllocator::allocate(&mut ctx).expect("allocate");
        assert_eq!(assignment[&high], Some(NodeId(0)));
        assert_eq!(assignment[&low], None);
    }

    #[test]
    fn excluded_nodes_are_never_chosen() {
        let mut ctx = context(2);
        ctx.model.node_mut(NodeId(0)).unclean = true;
        let r = add(&mut ctx, "r", &[(0, 1_000), (1, 1)]);
        let assignment = ColoringAllocator::allocate(&mut ctx).expect("allocate");
        assert_eq!(assignment[&r], Some(NodeId(1)));
    }

    #[test]
    fn verify_detects_split_color() {
        let mut ctx = context(2);
        let a = add(&mut ctx, "a", &[(0, 1), (1, 1)]);
        let b = add(&mut ctx, "b", &[(0, 1), (1, 1)]);
        ctx.model.add_colocation("c", a, b, ColocationStrength::Must);
        ColoringAllocator::allocate(&mut ctx).expect("allocate");
        ctx.model.resource_mut(b).assigned = Some(NodeId(1));
        assert!(matches!(
            ColoringAllocator::verify(&ctx),
            Err(PlacerError::ColorConflict { .. })
        ));
    }
}
