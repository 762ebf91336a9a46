//! # Action Synthesizer
//!
//! Compares each resource's replayed state with its allocation and creates
//! the actions that converge the two.
//!
//! ## Per primitive
//!
//! - `stop` on every current node the resource leaves, restarts on, or
//!   failed on; `demote` first where it was master
//! - `start` on the chosen node, optional when already running there
//! - `promote` / `demote` on the chosen node to reach the next role
//! - recurring monitors matching the next role
//!
//! Internal orderings tie these together: demote before stop, stop before
//! start, start before promote, and start or promote before monitors.
//!
//! Containers get pseudo `start`/`running`/`stop`/`stopped` actions that
//! bracket their members.

pub mod action;
pub mod history;

pub use action::{Action, ActionRequest, ActionTable, ActionWrapper, OpPolicy, unpack_operation};
pub use history::HistoryReplayer;

use crate::context::SchedulingContext;
use crate::primitives::op_key;
use crate::types::{
    ActionId, NoQuorumPolicy, NodeId, OrderKind, PlacerError, RecoveryPolicy, ResourceId, Role,
    Task,
};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Creates the actions of every resource.
pub struct ActionSynthesizer;

impl ActionSynthesizer {
    /// Synthesize actions for all primitives, then all containers.
    pub fn synthesize_all(ctx: &mut SchedulingContext) -> Result<(), PlacerError> {
        for rsc in ctx.model.primitives() {
            Self::synthesize(ctx, rsc)?;
        }
        for container in ctx.model.containers() {
            Self::bracket_container(ctx, container);
        }
        info!(actions = ctx.actions.len(), "actions synthesized");
        Ok(())
    }

    /// Actions of one primitive toward its allocated node.
    pub fn synthesize(ctx: &mut SchedulingContext, r: ResourceId) -> Result<(), PlacerError> {
        let opts = &ctx.model.options;
        let stop_all = !opts.quorum_satisfied() && opts.no_quorum_policy == NoQuorumPolicy::Stop;

        let rsc = ctx.model.resource(r);
        let name = rsc.name.clone();
        let recovery = rsc.recovery;
        let multiple_active = rsc.running_on.len() > 1 && rsc.unique;
        let current: Vec<NodeId> = rsc.running_on.iter().copied().collect();
        let mut chosen = if stop_all { None } else { rsc.assigned };
        let mut next_role = if chosen.is_some() {
            rsc.next_role
        } else {
            Role::Stopped
        };
        let mut leaving: BTreeSet<NodeId> = current
            .iter()
            .copied()
            .filter(|&n| Some(n) != chosen || rsc.restart_on.contains(&n))
            .collect();

        if multiple_active {
            ctx.diagnostics.processing_error(format!(
                "{} is active on {} nodes, recovering with {:?}",
                name,
                current.len(),
                recovery
            ));
            match recovery {
                RecoveryPolicy::StopStart => leaving.extend(current.iter().copied()),
                RecoveryPolicy::StopOnly => {
                    leaving.extend(current.iter().copied());
                    next_role = Role::Stopped;
                }
                RecoveryPolicy::Block => ctx.model.resource_mut(r).is_managed = false,
            }
        }
        if next_role == Role::Stopped {
            chosen = None;
        }
        ctx.model.resource_mut(r).next_role = next_role;

        let mut stops = Vec::new();
        let mut demotes = Vec::new();
        for &n in &current {
            let mandatory = leaving.contains(&n);
            let was_master = ctx.model.resource(r).role_on.get(&n) == Some(&Role::Master);
            if was_master && (mandatory || next_role < Role::Master) {
                let demote = ctx
                    .actions
                    .custom_action(&mut ctx.model, ActionRequest::new(r, Task::Demote).on(n));
                demotes.push(demote);
            }
            let stop = ctx.actions.custom_action(
                &mut ctx.model,
                ActionRequest::new(r, Task::Stop).on(n).optional(!mandatory),
            );
            stops.push(stop);
            if mandatory && Some(n) != chosen {
                Self::drop_stale(ctx, r, n);
            }
        }

        let Some(target) = chosen else {
            debug!(rsc = %name, "not allocated, stopping");
            return Self::order_internal(ctx, &demotes, &stops, None, &[], &[]);
        };

        let stopping_here = ctx
            .actions
            .find(&action_key(ctx, r, Task::Stop, 0), Some(target))
            .and_then(|id| ctx.actions.get(id))
            .is_some_and(|a| a.is_mandatory() && a.node == Some(target));
        let running_here = current.contains(&target) && !stopping_here;
        let start = ctx.actions.custom_action(
            &mut ctx.model,
            ActionRequest::new(r, Task::Start).on(target).optional(running_here),
        );

        let role_here = if running_here {
            ctx.model
                .resource(r)
                .role_on
                .get(&target)
                .copied()
                .unwrap_or(Role::Started)
        } else {
            Role::Started
        };
        let mut promotes = Vec::new();
        if next_role == Role::Master && role_here < Role::Master {
            promotes.push(ctx.actions.custom_action(
                &mut ctx.model,
                ActionRequest::new(r, Task::Promote).on(target),
            ));
        }

        let mut monitors = Vec::new();
        if !ctx.model.resource(r).orphan {
            let role_changes = next_role != role_here;
            let ops: Vec<(u64, Option<Role>)> = ctx
                .model
                .resource(r)
                .recurring_monitors(next_role)
                .map(|op| (op.interval_ms, op.role))
                .collect();
            for (interval, role) in ops {
                let recorded = ctx
                    .actions
                    .find(&action_key(ctx, r, Task::Monitor, interval), Some(target))
                    .is_some();
                let optional = running_here && recorded && !role_changes;
                let monitor = ctx.actions.custom_action(
                    &mut ctx.model,
                    ActionRequest::new(r, Task::Monitor)
                        .interval(interval)
                        .on(target)
                        .optional(optional),
                );
                monitors.push((monitor, role == Some(Role::Master)));
            }
        }

        Self::order_internal(ctx, &demotes, &stops, Some(start), &promotes, &monitors)
    }

    /// Actions left on a node the resource is leaving never run.
    fn drop_stale(ctx: &mut SchedulingContext, r: ResourceId, node: NodeId) {
        let stale: Vec<ActionId> = ctx
            .model
            .resource(r)
            .actions
            .iter()
            .copied()
            .filter(|&id| {
                ctx.actions.get(id).is_some_and(|a| {
                    a.node == Some(node) && !matches!(a.task, Task::Stop | Task::Demote | Task::Cancel)
                })
            })
            .collect();
        for id in stale {
            if let Some(action) = ctx.actions.get_mut(id) {
                action.optional = true;
            }
        }
    }

    fn order_internal(
        ctx: &mut SchedulingContext,
        demotes: &[ActionId],
        stops: &[ActionId],
        start: Option<ActionId>,
        promotes: &[ActionId],
        monitors: &[(ActionId, bool)],
    ) -> Result<(), PlacerError> {
        for &demote in demotes {
            for &stop in stops {
                if Self::same_node(ctx, demote, stop) {
                    ctx.actions.order(demote, stop, OrderKind::Optional)?;
                }
            }
        }
        let Some(start) = start else {
            return Ok(());
        };
        for &stop in stops {
            ctx.actions.order(stop, start, OrderKind::Mandatory)?;
        }
        for &promote in promotes {
            ctx.actions.order(start, promote, OrderKind::Mandatory)?;
        }
        for &(monitor, master_only) in monitors {
            ctx.actions.order(start, monitor, OrderKind::Mandatory)?;
            if master_only {
                for &promote in promotes {
                    ctx.actions.order(promote, monitor, OrderKind::Mandatory)?;
                }
            }
        }
        Ok(())
    }

    fn same_node(ctx: &SchedulingContext, a: ActionId, b: ActionId) -> bool {
        match (ctx.actions.get(a), ctx.actions.get(b)) {
            (Some(a), Some(b)) => a.node == b.node,
            _ => false,
        }
    }

    /// Pseudo actions of a group or clone. Each is mandatory when a member
    /// action it brackets is.
    fn bracket_container(ctx: &mut SchedulingContext, container: ResourceId) {
        let members = ctx.model.resource(container).members().to_vec();
        let member_mandatory = |ctx: &SchedulingContext, task: Task| {
            members.iter().any(|&m| {
                ctx.actions
                    .find_all(m, task)
                    .into_iter()
                    .any(|id| ctx.actions.get(id).is_some_and(|a| a.is_mandatory()))
            })
        };
        let starting = member_mandatory(ctx, Task::Start);
        let stopping = member_mandatory(ctx, Task::Stop);

        for (task, mandatory) in [
            (Task::Start, starting),
            (Task::Running, starting),
            (Task::Stop, stopping),
            (Task::Stopped, stopping),
        ] {
            ctx.actions.custom_action(
                &mut ctx.model,
                ActionRequest::new(container, task)
                    .pseudo()
                    .optional(!mandatory),
            );
        }
        debug!(
            container = %ctx.model.resource(container).name,
            starting,
            stopping,
            "container bracketed"
        );
    }
}

fn action_key(ctx: &SchedulingContext, r: ResourceId, task: Task, interval_ms: u64) -> String {
    op_key(&ctx.model.resource(r).name, task.as_str(), interval_ms)
}

// =============================================================================
// TESTS
// =============================================================================
