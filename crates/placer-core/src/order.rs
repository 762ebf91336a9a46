//! # Ordering Graph Builder
//!
//! Populates the before/after adjacency of the synthesized actions.
//!
//! Three sources feed the graph:
//!
//! 1. Ordering constraints of the model (configured, group/clone internal,
//!    recover pairs and orphan cancels). Resource/task endpoints resolve to
//!    every matching action; a task never scheduled gets a placeholder pseudo
//!    action.
//! 2. Fencing and shutdown. Stops on a node being fenced or shut down run
//!    before the fence/shutdown; stops on a fenced offline node are implied
//!    by the fence and complete with it. Starts of the same resources
//!    elsewhere wait for the fence/shutdown.
//! 3. A fix-point pass that propagates `mandatory` and `unrunnable` along
//!    the edges, and turns a mandatory start where the resource already runs
//!    into a restart.

use crate::context::SchedulingContext;
use crate::model::ActionRef;
use crate::synth::ActionRequest;
use crate::types::{ActionId, NodeId, OrderKind, PlacerError, Task};
use tracing::{debug, info};

/// Builds the ordering graph.
pub struct OrderingBuilder;

impl OrderingBuilder {
    pub fn order(ctx: &mut SchedulingContext) -> Result<(), PlacerError> {
        Self::apply_constraints(ctx)?;
        Self::fencing(ctx)?;
        let rounds = Self::propagate(ctx);
        info!(
            orderings = ctx.model.orderings.len(),
            rounds, "ordering graph built"
        );
        Ok(())
    }

    fn apply_constraints(ctx: &mut SchedulingContext) -> Result<(), PlacerError> {
        let orderings = ctx.model.orderings.clone();
        for ordering in &orderings {
            let firsts = Self::resolve(ctx, ordering.first)?;
            let thens = Self::resolve(ctx, ordering.then)?;
            for &first in &firsts {
                for &then in &thens {
                    ctx.actions.order(first, then, ordering.kind)?;
                }
            }
            debug!(
                ordering = %ordering.name,
                firsts = firsts.len(),
                thens = thens.len(),
                kind = ?ordering.kind,
                "ordering applied"
            );
        }
        Ok(())
    }

    /// Concrete actions an endpoint refers to.
    pub fn resolve(ctx: &mut SchedulingContext, endpoint: ActionRef) -> Result<Vec<ActionId>, PlacerError> {
        match endpoint {
            ActionRef::Action(id) => {
                ctx.actions.action(id)?;
                Ok(vec![id])
            }
            ActionRef::Task { resource, task } => {
                let found = ctx.actions.find_all(resource, task);
                if !found.is_empty() {
                    return Ok(found);
                }
                let placeholder = ctx.actions.custom_action(
                    &mut ctx.model,
                    ActionRequest::new(resource, task).pseudo().optional(true),
                );
                Ok(vec![placeholder])
            }
        }
    }

    // =========================================================================
    // FENCING & SHUTDOWN
    // =========================================================================

    fn fencing(ctx: &mut SchedulingContext) -> Result<(), PlacerError> {
        let nodes: Vec<NodeId> = ctx.model.nodes.iter().map(|n| n.id).collect();
        for n in nodes {
            let node = ctx.model.node(n);
            let (name, online, unclean, shutdown) =
                (node.name.clone(), node.online, node.unclean, node.shutdown);
            if unclean {
                if !ctx.model.options.stonith_enabled {
                    ctx.diagnostics.processing_warning(format!(
                        "node {} is unclean but fencing is disabled",
                        name
                    ));
                    continue;
                }
                let fence = ctx
                    .actions
                    .custom_action(&mut ctx.model, ActionRequest::cluster(Task::Fence, n));
                for stop in ctx.actions.on_node(n, Task::Stop) {
                    if online {
                        ctx.actions.order(stop, fence, OrderKind::Optional)?;
                    } else {
                        let action = ctx.actions.action_mut(stop)?;
                        action.pseudo = true;
                        action.runnable = true;
                        ctx.actions.order(fence, stop, OrderKind::Mandatory)?;
                    }
                    Self::before_restarts(ctx, fence, stop, n)?;
                }
                info!(node = %name, online, "fencing scheduled");
            } else if shutdown && online {
                let shutdown = ctx
                    .actions
                    .custom_action(&mut ctx.model, ActionRequest::cluster(Task::Shutdown, n));
                for stop in ctx.actions.on_node(n, Task::Stop) {
                    ctx.actions.order(stop, shutdown, OrderKind::Optional)?;
                    Self::before_restarts(ctx, shutdown, stop, n)?;
                }
                info!(node = %name, "shutdown scheduled");
            }
        }
        Ok(())
    }

    /// Order `gate` before every start of `stop`'s resource on other nodes.
    fn before_restarts(
        ctx: &mut SchedulingContext,
        gate: ActionId,
        stop: ActionId,
        node: NodeId,
    ) -> Result<(), PlacerError> {
        let Some(rsc) = ctx.actions.action(stop)?.resource else {
            return Ok(());
        };
        for start in ctx.actions.find_all(rsc, Task::Start) {
            if ctx.actions.action(start)?.node != Some(node) {
                ctx.actions.order(gate, start, OrderKind::Optional)?;
            }
        }
        Ok(())
    }

    // =========================================================================
    // PROPAGATION
    // =========================================================================

    /// Propagate action state until nothing changes; returns the number of
    /// rounds.
    pub fn propagate(ctx: &mut SchedulingContext) -> u32 {
        let mut rounds = 0u32;
        loop {
            rounds = rounds.saturating_add(1);
            let mut changed = false;
            for i in 0..ctx.actions.len() {
                changed |= Self::propagate_from(ctx, ActionId(i as u64));
            }
            if !changed {
                return rounds;
            }
        }
    }

    fn propagate_from(ctx: &mut SchedulingContext, id: ActionId) -> bool {
        let Some(action) = ctx.actions.get(id) else {
            return false;
        };
        if action.optional {
            return false;
        }
        let runnable = action.runnable;
        let after = action.after.clone();
        let restart = match (action.task, action.resource, action.node) {
            (Task::Start, Some(r), Some(n))
                if ctx.model.resource(r).running_on.contains(&n)
                    && !ctx.model.resource(r).start_pending.contains(&n) =>
            {
                Some((r, n))
            }
            _ => None,
        };

        let mut changed = false;
        for wrapper in after {
            let managed = ctx
                .actions
                .get(wrapper.action)
                .and_then(|then| then.resource)
                .is_none_or(|r| ctx.model.resource(r).is_managed);
            let Some(then) = ctx.actions.get_mut(wrapper.action) else {
                continue;
            };
            if wrapper.kind.propagates_mandatory() && then.optional && managed {
                then.optional = false;
                changed = true;
            }
            if !runnable && wrapper.kind.propagates_unrunnable() && then.runnable {
                then.runnable = false;
                changed = true;
            }
        }

        if let Some((r, n)) = restart {
            for stop in ctx.actions.find_all(r, Task::Stop) {
                if let Some(action) = ctx.actions.get_mut(stop) {
                    if action.node == Some(n) && action.optional {
                        debug!(action = %stop, "restart makes stop mandatory");
                        action.optional = false;
                        changed = true;
                    }
                }
            }
        }
        changed
    }
}

// =============================================================================
// TESTS
// =============================================================================
