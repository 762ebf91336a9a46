//! # Operation History Replay
//!
//! Folds each resource's recorded operations into its current role, failure
//! flags and the actions needed to recover. Runs before placement, since
//! failures pin resources away from nodes.
//!
//! ## Sort order
//!
//! Completed operations come first by ascending call id. Operations still in
//! flight follow, by the transition id decoded from their transition magic;
//! an unknown transition or the shutdown transition sorts last.

use super::action::{ActionRequest, unpack_operation};
use crate::context::SchedulingContext;
use crate::input::{OpRecordSpec, ResourceHistorySpec};
use crate::model::{ActionRef, AgentId, LocationConstraint, NodeList, Resource, ResourceKind};
use crate::primitives::{
    RC_FAILED_MASTER, RC_NOT_RUNNING, RC_OK, RC_RUNNING_MASTER, SHUTDOWN_TRANSITION_ID,
};
use crate::types::{
    NodeId, OnFail, OpStatus, OrderKind, PlacerError, ResourceId, Role, Task,
};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Replays operation history into the model.
pub struct HistoryReplayer;

impl HistoryReplayer {
    /// Replay every history entry of the model.
    ///
    /// Fails only on an invalid call id.
    pub fn replay(ctx: &mut SchedulingContext) -> Result<(), PlacerError> {
        let history = std::mem::take(&mut ctx.model.history);
        let result = history
            .iter()
            .try_for_each(|entry| Self::replay_entry(ctx, entry));
        ctx.model.history = history;
        result
    }

    fn replay_entry(ctx: &mut SchedulingContext, entry: &ResourceHistorySpec) -> Result<(), PlacerError> {
        let Some(node) = ctx.model.find_node(&entry.node) else {
            ctx.diagnostics.processing_warning(format!(
                "history for {} on unknown node {}",
                entry.resource, entry.node
            ));
            return Ok(());
        };
        let ops = Self::sorted_ops(entry)?;
        let Some(rsc) = Self::resolve_resource(ctx, entry, node) else {
            return Ok(());
        };

        let agent = AgentId {
            class: entry.class.clone(),
            agent: entry.agent.clone(),
            provider: entry.provider.clone(),
        };
        if ctx.model.resource(rsc).agent != agent {
            info!(rsc = %entry.resource, node = %entry.node, "agent changed, restarting");
            ctx.model.resource_mut(rsc).restart_on.insert(node);
        }

        let mut replay = Replay {
            rsc,
            node,
            role: Role::Stopped,
            orphan_ops: BTreeSet::new(),
        };
        for op in ops {
            replay.apply(ctx, op);
        }
        replay.settle(ctx);
        Ok(())
    }

    /// Operations in replay order. Completed operations must carry distinct,
    /// non-negative call ids.
    pub fn sorted_ops(entry: &ResourceHistorySpec) -> Result<Vec<&OpRecordSpec>, PlacerError> {
        let mut seen = BTreeSet::new();
        for op in entry.ops.iter().filter(|op| op.status != OpStatus::Pending) {
            if op.call_id < 0 || !seen.insert(op.call_id) {
                return Err(PlacerError::InvalidCallId {
                    resource: entry.resource.clone(),
                    node: entry.node.clone(),
                    call_id: op.call_id,
                });
            }
        }
        let mut ops: Vec<&OpRecordSpec> = entry.ops.iter().collect();
        ops.sort_by_key(|op| Self::sort_key(op));
        Ok(ops)
    }

    fn sort_key(op: &OpRecordSpec) -> (u8, i64) {
        if op.status != OpStatus::Pending {
            return (0, op.call_id);
        }
        let transition = op
            .transition_magic
            .as_deref()
            .and_then(|magic| magic.split_once(';'))
            .and_then(|(_, key)| key.split(':').next())
            .and_then(|id| id.parse::<i64>().ok())
            .filter(|&id| id != SHUTDOWN_TRANSITION_ID)
            .unwrap_or(i64::MAX);
        (1, transition)
    }

    /// The resource an entry applies to. Unknown resources become orphans;
    /// anonymous clone history is remapped onto a free instance.
    fn resolve_resource(
        ctx: &mut SchedulingContext,
        entry: &ResourceHistorySpec,
        node: NodeId,
    ) -> Option<ResourceId> {
        let Some(id) = ctx.model.find_resource(&entry.resource) else {
            return Some(Self::add_orphan(ctx, entry));
        };
        let rsc = ctx.model.resource(id);
        match &rsc.kind {
            ResourceKind::Group { .. } => {
                ctx.diagnostics.processing_warning(format!(
                    "history recorded against group {}",
                    entry.resource
                ));
                None
            }
            ResourceKind::Clone { instances, .. } => {
                let instances = instances.clone();
                Self::anonymous_instance(ctx, &instances, node, &entry.resource)
            }
            ResourceKind::Primitive => {
                if rsc.unique || rsc.running_on.is_empty() || rsc.running_on.contains(&node) {
                    return Some(id);
                }
                let parent = rsc.parent?;
                let instances = ctx.model.resource(parent).members().to_vec();
                Self::anonymous_instance(ctx, &instances, node, &entry.resource)
            }
        }
    }

    fn anonymous_instance(
        ctx: &mut SchedulingContext,
        instances: &[ResourceId],
        node: NodeId,
        name: &str,
    ) -> Option<ResourceId> {
        let model = &ctx.model;
        let found = instances
            .iter()
            .copied()
            .find(|&i| model.resource(i).running_on.contains(&node))
            .or_else(|| {
                instances
                    .iter()
                    .copied()
                    .find(|&i| model.resource(i).running_on.is_empty())
            });
        match found {
            Some(instance) => {
                debug!(history = %name, instance = %model.resource(instance).name, "remapped");
                Some(instance)
            }
            None => {
                ctx.diagnostics.processing_warning(format!(
                    "no free instance of {} for history on {}",
                    name,
                    ctx.model.node(node).name
                ));
                None
            }
        }
    }

    fn add_orphan(ctx: &mut SchedulingContext, entry: &ResourceHistorySpec) -> ResourceId {
        let agent = AgentId {
            class: entry.class.clone(),
            agent: entry.agent.clone(),
            provider: entry.provider.clone(),
        };
        let mut rsc = Resource::primitive(ResourceId(0), entry.resource.clone(), agent);
        rsc.orphan = true;
        rsc.is_managed = ctx.model.options.is_managed_default;
        rsc.stickiness = ctx.model.options.default_resource_stickiness;
        info!(rsc = %entry.resource, "orphan resource found in history");
        ctx.model.add_resource(rsc)
    }
}

// =============================================================================
// PER-ENTRY REPLAY
// =============================================================================

/// Replay state of one resource on one node.
struct Replay {
    rsc: ResourceId,
    node: NodeId,
    role: Role,
    /// Recurring operations with no definition, by task and interval.
    orphan_ops: BTreeSet<(Task, u64)>,
}

impl Replay {
    fn apply(&mut self, ctx: &mut SchedulingContext, op: &OpRecordSpec) {
        if matches!(op.task, Task::Notify | Task::Cancel) {
            return;
        }
        if op.interval_ms > 0
            && ctx
                .model
                .resource(self.rsc)
                .find_op(op.task, op.interval_ms)
                .is_none()
        {
            self.orphan_ops.insert((op.task, op.interval_ms));
        }

        let (mut status, forced) = Self::outcome(op);
        let policy = unpack_operation(
            &ctx.model,
            ctx.model.resource(self.rsc),
            op.task,
            op.interval_ms,
        );
        if status.is_failure() && policy.on_fail == OnFail::Ignore {
            debug!(rsc = %ctx.model.resource(self.rsc).name, task = %op.task, "failure ignored");
            status = OpStatus::Done;
        }

        match status {
            OpStatus::Pending => self.pending(ctx, op),
            OpStatus::Done => self.done(ctx, op, forced),
            OpStatus::Error | OpStatus::Timeout | OpStatus::NotSupported => {
                self.failed(ctx, op, status, forced, policy.on_fail, policy.fail_role);
            }
            OpStatus::Cancelled => {
                let name = ctx.model.resource(self.rsc).name.clone();
                ctx.diagnostics.processing_error(format!(
                    "{} {} on {} was cancelled (call {})",
                    name,
                    op.task,
                    ctx.model.node(self.node).name,
                    op.call_id
                ));
            }
        }
    }

    /// Effective status, and the role the return code forces, if any.
    fn outcome(op: &OpRecordSpec) -> (OpStatus, Option<Role>) {
        if !matches!(op.status, OpStatus::Done | OpStatus::Error) {
            return (op.status, None);
        }
        let forced = match op.rc {
            RC_NOT_RUNNING => Some(Role::Stopped),
            RC_RUNNING_MASTER | RC_FAILED_MASTER => Some(Role::Master),
            _ => None,
        };
        let status = match op.target_rc {
            _ if op.rc == RC_FAILED_MASTER => OpStatus::Error,
            Some(target) if op.rc == target => OpStatus::Done,
            Some(_) => OpStatus::Error,
            None if op.rc == RC_RUNNING_MASTER => OpStatus::Done,
            None if matches!(op.rc, RC_OK | RC_NOT_RUNNING) => op.status,
            None => OpStatus::Error,
        };
        (status, forced)
    }

    fn pending(&mut self, ctx: &mut SchedulingContext, op: &OpRecordSpec) {
        match op.task {
            Task::Start => {
                ctx.model.resource_mut(self.rsc).start_pending.insert(self.node);
                self.role = self.role.max(Role::Started);
                if ctx.model.options.quorum_satisfied() {
                    ctx.actions
                        .custom_action(&mut ctx.model, ActionRequest::new(self.rsc, Task::Start));
                }
            }
            Task::Promote => self.role = Role::Master,
            task if self.role > Role::Stopped => {
                ctx.actions.custom_action(
                    &mut ctx.model,
                    ActionRequest::new(self.rsc, task).interval(op.interval_ms),
                );
            }
            _ => {}
        }
    }

    fn done(&mut self, ctx: &mut SchedulingContext, op: &OpRecordSpec, forced: Option<Role>) {
        self.role = match op.task {
            Task::Stop => Role::Stopped,
            Task::Promote => Role::Master,
            Task::Demote => Role::Slave,
            _ => self.role.max(Role::Started),
        };
        if let Some(role) = forced {
            self.role = role;
        }

        let recurring = op.interval_ms > 0;
        if recurring {
            ctx.actions.custom_action(
                &mut ctx.model,
                ActionRequest::new(self.rsc, op.task)
                    .interval(op.interval_ms)
                    .on(self.node)
                    .optional(true),
            );
        }

        let one_shot_monitor = op.task == Task::Monitor && !recurring;
        let rsc = ctx.model.resource(self.rsc);
        if one_shot_monitor || op.params.is_empty() || op.params == rsc.params {
            return;
        }
        if op.task == Task::Start {
            info!(rsc = %rsc.name, node = %ctx.model.node(self.node).name, "parameters changed, restarting");
            ctx.model.resource_mut(self.rsc).restart_on.insert(self.node);
        } else if recurring {
            ctx.actions.custom_action(
                &mut ctx.model,
                ActionRequest::new(self.rsc, op.task)
                    .interval(op.interval_ms)
                    .on(self.node),
            );
        }
    }

    fn failed(
        &mut self,
        ctx: &mut SchedulingContext,
        op: &OpRecordSpec,
        status: OpStatus,
        forced: Option<Role>,
        on_fail: OnFail,
        fail_role: Role,
    ) {
        let name = ctx.model.resource(self.rsc).name.clone();
        let node_name = ctx.model.node(self.node).name.clone();
        ctx.diagnostics.processing_warning(format!(
            "{} {} failed on {}: rc={} status={:?}",
            name, op.task, node_name, op.rc, status
        ));

        if matches!(op.task, Task::Start | Task::Stop) || status == OpStatus::NotSupported {
            self.pin_away(ctx, "failed");
        }
        ctx.model.resource_mut(self.rsc).failed = true;
        self.role = match op.task {
            Task::Promote | Task::Demote => Role::Master,
            _ => self.role.max(Role::Started),
        };
        if let Some(role) = forced {
            self.role = role;
        }

        if !matches!(op.task, Task::Start | Task::Promote) {
            ctx.actions.custom_action(
                &mut ctx.model,
                ActionRequest::new(self.rsc, op.task)
                    .interval(op.interval_ms)
                    .on(self.node),
            );
        }

        if ctx.model.node(self.node).unclean {
            self.force_stop(ctx);
            return;
        }
        match on_fail {
            OnFail::Fence => {
                info!(node = %node_name, rsc = %name, "failure requires fencing");
                ctx.model.node_mut(self.node).unclean = true;
                self.force_stop(ctx);
            }
            OnFail::Block => {
                info!(rsc = %name, "failure blocks resource");
                ctx.model.resource_mut(self.rsc).is_managed = false;
            }
            OnFail::Ignore => {}
            OnFail::Migrate => {
                self.force_stop(ctx);
                self.pin_away(ctx, "migrate");
            }
            OnFail::Stop | OnFail::Restart => {
                if fail_role == Role::Stopped {
                    let rsc = ctx.model.resource_mut(self.rsc);
                    rsc.pinned_stopped = true;
                    rsc.next_role = Role::Stopped;
                    self.force_stop(ctx);
                } else if fail_role != Role::Started {
                    ctx.model.resource_mut(self.rsc).next_role = fail_role;
                } else {
                    self.force_stop(ctx);
                }
            }
        }
    }

    fn force_stop(&self, ctx: &mut SchedulingContext) {
        ctx.actions.custom_action(
            &mut ctx.model,
            ActionRequest::new(self.rsc, Task::Stop).on(self.node),
        );
    }

    /// Ban the resource from this node for the rest of the pass.
    fn pin_away(&self, ctx: &mut SchedulingContext, reason: &str) {
        let mut node = ctx.model.node(self.node).copy();
        node.exclude();
        let id = format!(
            "{}-{}-{}",
            ctx.model.resource(self.rsc).name,
            reason,
            ctx.model.node(self.node).name
        );
        ctx.model.locations.push(LocationConstraint {
            id,
            resource: self.rsc,
            role: None,
            nodes: NodeList::from_iter([node]),
        });
    }

    /// Record where the resource runs and cancel orphaned recurring ops.
    fn settle(self, ctx: &mut SchedulingContext) {
        if self.role == Role::Stopped {
            let stops: Vec<_> = ctx
                .actions
                .find_all(self.rsc, Task::Stop)
                .into_iter()
                .filter(|&id| ctx.actions.get(id).is_some_and(|a| a.node == Some(self.node)))
                .collect();
            for id in stops {
                if let Some(action) = ctx.actions.get_mut(id) {
                    action.optional = true;
                }
            }
            return;
        }

        let rsc = ctx.model.resource_mut(self.rsc);
        rsc.running_on.insert(self.node);
        rsc.role_on.insert(self.node, self.role);
        rsc.role = rsc.role.max(self.role);
        ctx.model.node_mut(self.node).running.insert(self.rsc);

        if ctx.model.options.stop_orphan_actions {
            for &(task, interval) in &self.orphan_ops {
                let cancel = ctx.actions.custom_action(
                    &mut ctx.model,
                    ActionRequest::new(self.rsc, Task::Cancel)
                        .interval(interval)
                        .on(self.node),
                );
                if let Some(action) = ctx.actions.get_mut(cancel) {
                    action.meta.insert("operation".to_string(), task.to_string());
                }
                ctx.model.add_ordering(
                    format!("{}-cancel-{}", ctx.model.resource(self.rsc).name, interval),
                    ActionRef::Action(cancel),
                    ActionRef::Task {
                        resource: self.rsc,
                        task: Task::Stop,
                    },
                    OrderKind::Optional,
                );
            }
        }

        if ctx.model.node(self.node).unclean {
            self.force_stop(ctx);
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
    use crate::context::Diagnostics;
    use crate::input::NodeKind;
    use crate::model::{ClusterModel, NodeDetails, OpDefinition};
    use crate::primitives::DEFAULT_OP_TIMEOUT_MS;
    use std::collections::BTreeMap;

    fn context(options: ClusterOptions) -> SchedulingContext {
        let mut model = ClusterModel::new(options);
        for name in ["a", "b"] {
            model.add_node(NodeDetails {
                id: NodeId(0),
                uuid: name.to_string(),
                name: name.to_string(),
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
        let mut rsc = Resource::primitive(ResourceId(0), "r", dummy());
        rsc.operations.push(OpDefinition {
            task: Task::Monitor,
            interval_ms: 10_000,
            timeout_ms: DEFAULT_OP_TIMEOUT_MS,
            prereq: None,
            on_fail: None,
            role_after_failure: None,
            role: None,
        });
        model.add_resource(rsc);
        SchedulingContext::new(model, Diagnostics::default())
    }

    fn dummy() -> AgentId {
        AgentId {
            class: "ocf".to_string(),
            agent: "Dummy".to_string(),
            provider: Some("pacemaker".to_string()),
        }
    }

    fn op(task: Task, call_id: i64, status: OpStatus, rc: i32) -> OpRecordSpec {
        OpRecordSpec {
            task,
            interval_ms: 0,
            call_id,
            status,
            rc,
            target_rc: None,
            transition_magic: None,
            params: BTreeMap::new(),
        }
    }

    fn entry(resource: &str, node: &str, ops: Vec<OpRecordSpec>) -> ResourceHistorySpec {
        ResourceHistorySpec {
            resource: resource.to_string(),
            node: node.to_string(),
            class: "ocf".to_string(),
            agent: "Dummy".to_string(),
            provider: Some("pacemaker".to_string()),
            ops,
        }
    }

    fn stops_on(ctx: &SchedulingContext, node: NodeId) -> Vec<bool> {
        ctx.actions
            .find_all(ResourceId(0), Task::Stop)
            .into_iter()
            .filter_map(|id| ctx.actions.get(id))
            .filter(|a| a.node == Some(node))
            .map(|a| a.optional)
            .collect()
    }

    #[test]
    fn completed_ops_sort_by_call_id_pending_last() {
        let mut pending = op(Task::Stop, -1, OpStatus::Pending, 0);
        pending.transition_magic = Some("-1:0;-1:abc".to_string());
        let mut in_flight = op(Task::Monitor, -1, OpStatus::Pending, 0);
        in_flight.transition_magic = Some("-1:0;12:abc".to_string());
        let e = entry(
            "r",
            "a",
            vec![
                pending,
                op(Task::Start, 5, OpStatus::Done, 0),
                in_flight,
                op(Task::Monitor, 2, OpStatus::Done, 7),
            ],
        );
        let tasks: Vec<_> = HistoryReplayer::sorted_ops(&e)
            .expect("sorted")
            .iter()
            .map(|o| (o.task, o.call_id))
            .collect();
        assert_eq!(
            tasks,
            vec![
                (Task::Monitor, 2),
                (Task::Start, 5),
                (Task::Monitor, -1),
                (Task::Stop, -1)
            ]
        );
    }

    #[test]
    fn negative_completed_call_id_aborts() {
        let mut ctx = context(ClusterOptions::default());
        ctx.model.history = vec![entry("r", "a", vec![op(Task::Start, -3, OpStatus::Done, 0)])];
        assert!(matches!(
            HistoryReplayer::replay(&mut ctx),
            Err(PlacerError::InvalidCallId { call_id: -3, .. })
        ));
    }

    #[test]
    fn start_then_stop_leaves_resource_stopped() {
        let mut ctx = context(ClusterOptions::default());
        ctx.model.history = vec![entry(
            "r",
            "a",
            vec![
                op(Task::Start, 1, OpStatus::Done, 0),
                op(Task::Stop, 2, OpStatus::Done, 0),
            ],
        )];
        HistoryReplayer::replay(&mut ctx).expect("replay");
        assert!(!ctx.model.resource(ResourceId(0)).is_active());
    }

    #[test]
    fn running_resource_is_recorded_on_node() {
        let mut ctx = context(ClusterOptions::default());
        ctx.model.history = vec![entry("r", "b", vec![op(Task::Start, 1, OpStatus::Done, 0)])];
        HistoryReplayer::replay(&mut ctx).expect("replay");
        let rsc = ctx.model.resource(ResourceId(0));
        assert!(rsc.running_on.contains(&NodeId(1)));
        assert_eq!(rsc.role, Role::Started);
        assert!(ctx.model.node(NodeId(1)).running.contains(&ResourceId(0)));
    }

    #[test]
    fn one_shot_monitor_not_running_forces_stopped() {
        let mut ctx = context(ClusterOptions::default());
        ctx.model.history = vec![entry(
            "r",
            "a",
            vec![
                op(Task::Start, 1, OpStatus::Done, 0),
                op(Task::Monitor, 2, OpStatus::Done, RC_NOT_RUNNING),
            ],
        )];
        HistoryReplayer::replay(&mut ctx).expect("replay");
        assert!(!ctx.model.resource(ResourceId(0)).is_active());
        assert!(!ctx.model.resource(ResourceId(0)).failed);
    }

    #[test]
    fn not_running_rc_stops_any_task_and_keeps_status() {
        let mut ctx = context(ClusterOptions::default());
        ctx.model.history = vec![entry(
            "r",
            "a",
            vec![op(Task::Start, 1, OpStatus::Done, RC_NOT_RUNNING)],
        )];
        HistoryReplayer::replay(&mut ctx).expect("replay");
        let rsc = ctx.model.resource(ResourceId(0));
        assert!(!rsc.is_active());
        assert!(!rsc.failed);
        assert!(ctx.diagnostics.processing_warnings.is_empty());
    }

    #[test]
    fn rc_failed_master_is_an_error_in_master_role() {
        let mut ctx = context(ClusterOptions::default());
        ctx.model.history = vec![entry(
            "r",
            "a",
            vec![op(Task::Monitor, 1, OpStatus::Done, RC_FAILED_MASTER)],
        )];
        HistoryReplayer::replay(&mut ctx).expect("replay");
        let rsc = ctx.model.resource(ResourceId(0));
        assert!(rsc.failed);
        assert_eq!(rsc.role, Role::Master);
    }

    #[test]
    fn target_rc_mismatch_is_failure() {
        let mut ctx = context(ClusterOptions::default());
        let mut start = op(Task::Start, 1, OpStatus::Done, 1);
        start.target_rc = Some(0);
        ctx.model.history = vec![entry("r", "a", vec![start])];
        HistoryReplayer::replay(&mut ctx).expect("replay");
        assert!(ctx.model.resource(ResourceId(0)).failed);
        assert_eq!(ctx.model.locations.len(), 1);
        assert_eq!(stops_on(&ctx, NodeId(0)), vec![false]);
    }

    #[test]
    fn failed_start_with_fence_marks_node_unclean() {
        let mut ctx = context(ClusterOptions {
            stonith_enabled: true,
            ..Default::default()
        });
        ctx.model.resource_mut(ResourceId(0)).operations.push(OpDefinition {
            task: Task::Start,
            interval_ms: 0,
            timeout_ms: DEFAULT_OP_TIMEOUT_MS,
            prereq: None,
            on_fail: Some(OnFail::Fence),
            role_after_failure: None,
            role: None,
        });
        ctx.model.history = vec![entry("r", "a", vec![op(Task::Start, 1, OpStatus::Error, 1)])];
        HistoryReplayer::replay(&mut ctx).expect("replay");
        assert!(ctx.model.node(NodeId(0)).unclean);
        assert_eq!(stops_on(&ctx, NodeId(0)), vec![false]);
    }

    #[test]
    fn block_makes_resource_unmanaged() {
        let mut ctx = context(ClusterOptions::default());
        ctx.model.history = vec![entry(
            "r",
            "a",
            vec![
                op(Task::Start, 1, OpStatus::Done, 0),
                op(Task::Stop, 2, OpStatus::Timeout, 1),
            ],
        )];
        HistoryReplayer::replay(&mut ctx).expect("replay");
        let rsc = ctx.model.resource(ResourceId(0));
        assert!(!rsc.is_managed);
        assert!(rsc.is_active());
        assert_eq!(stops_on(&ctx, NodeId(0)), vec![true]);
    }

    #[test]
    fn block_on_unclean_node_only_stops() {
        let mut ctx = context(ClusterOptions::default());
        ctx.model.node_mut(NodeId(0)).unclean = true;
        ctx.model.history = vec![entry(
            "r",
            "a",
            vec![
                op(Task::Start, 1, OpStatus::Done, 0),
                op(Task::Stop, 2, OpStatus::Timeout, 1),
            ],
        )];
        HistoryReplayer::replay(&mut ctx).expect("replay");
        let rsc = ctx.model.resource(ResourceId(0));
        assert!(rsc.is_managed);
        assert!(rsc.failed);
        assert_eq!(stops_on(&ctx, NodeId(0)), vec![false]);
    }

    #[test]
    fn unknown_resource_becomes_orphan_with_cancelled_monitor() {
        let mut ctx = context(ClusterOptions::default());
        let mut monitor = op(Task::Monitor, 2, OpStatus::Done, 0);
        monitor.interval_ms = 30_000;
        ctx.model.history = vec![entry(
            "ghost",
            "b",
            vec![op(Task::Start, 1, OpStatus::Done, 0), monitor],
        )];
        HistoryReplayer::replay(&mut ctx).expect("replay");
        let ghost = ctx.model.find_resource("ghost").expect("orphan");
        assert!(ctx.model.resource(ghost).orphan);
        assert!(ctx.model.resource(ghost).is_active());
        let cancels = ctx.actions.find_all(ghost, Task::Cancel);
        assert_eq!(cancels.len(), 1);
        assert_eq!(ctx.model.orderings.len(), 1);
    }

    #[test]
    fn changed_start_params_restart() {
        let mut ctx = context(ClusterOptions::default());
        ctx.model
            .resource_mut(ResourceId(0))
            .params
            .insert("port".to_string(), "80".to_string());
        let mut start = op(Task::Start, 1, OpStatus::Done, 0);
        start.params.insert("port".to_string(), "8080".to_string());
        ctx.model.history = vec![entry("r", "a", vec![start])];
        HistoryReplayer::replay(&mut ctx).expect("replay");
        assert!(ctx.model.resource(ResourceId(0)).restart_on.contains(&NodeId(0)));
    }

    #[test]
    fn pending_start_is_reissued_unbound() {
        let mut ctx = context(ClusterOptions::default());
        ctx.model.history = vec![entry("r", "a", vec![op(Task::Start, -1, OpStatus::Pending, 0)])];
        HistoryReplayer::replay(&mut ctx).expect("replay");
        let rsc = ctx.model.resource(ResourceId(0));
        assert!(rsc.start_pending.contains(&NodeId(0)));
        let starts = ctx.actions.find_all(ResourceId(0), Task::Start);
        assert_eq!(starts.len(), 1);
        assert_eq!(ctx.actions.get(starts[0]).and_then(|a| a.node), None);
    }
}
