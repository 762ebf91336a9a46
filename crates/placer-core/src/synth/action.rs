//! Actions, their ordering wrappers, and the deduplicating action table.

use crate::model::{ClusterModel, Resource};
use crate::primitives::{DEFAULT_OP_TIMEOUT_MS, op_key};
use crate::types::{
    ActionId, Needs, NoQuorumPolicy, NodeId, OnFail, OrderKind, PlacerError, ResourceId, Role,
    StopFailurePolicy, Task,
};
use std::collections::BTreeMap;
use tracing::{debug, warn};

// =============================================================================
// ACTION
// =============================================================================

/// A typed edge to another action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionWrapper {
    pub action: ActionId,
    pub kind: OrderKind,
}

/// One scheduled (or recorded) operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub id: ActionId,
    /// `None` for cluster-level actions (fencing, shutdown).
    pub resource: Option<ResourceId>,
    pub node: Option<NodeId>,
    pub task: Task,
    /// Deduplication key: resource, task and interval.
    pub key: String,
    pub interval_ms: u64,
    pub timeout_ms: u64,
    pub optional: bool,
    pub runnable: bool,
    /// Never dispatched; completes once its inputs have.
    pub pseudo: bool,
    pub needs: Needs,
    pub on_fail: OnFail,
    pub fail_role: Role,
    /// Extra values handed to the executor.
    pub meta: BTreeMap<String, String>,
    /// Actions that must complete first.
    pub before: Vec<ActionWrapper>,
    /// Actions waiting on this one.
    pub after: Vec<ActionWrapper>,
}

impl Action {
    #[must_use]
    pub fn is_mandatory(&self) -> bool {
        !self.optional
    }
}

/// Relative strength used when the same pair is ordered twice.
const fn strength(kind: OrderKind) -> u8 {
    match kind {
        OrderKind::Optional => 0,
        OrderKind::Recover => 1,
        OrderKind::Mandatory => 2,
    }
}

// =============================================================================
// REQUEST
// =============================================================================

/// Parameters of a [`ActionTable::custom_action`] lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionRequest {
    resource: Option<ResourceId>,
    task: Task,
    interval_ms: u64,
    node: Option<NodeId>,
    optional: bool,
    pseudo: bool,
}

impl ActionRequest {
    /// A mandatory, unbound action of `resource`.
    #[must_use]
    pub fn new(resource: ResourceId, task: Task) -> Self {
        Self {
            resource: Some(resource),
            task,
            interval_ms: 0,
            node: None,
            optional: false,
            pseudo: false,
        }
    }

    /// A cluster-level action, owned by no resource.
    #[must_use]
    pub fn cluster(task: Task, node: NodeId) -> Self {
        Self {
            resource: None,
            task,
            interval_ms: 0,
            node: Some(node),
            optional: false,
            pseudo: false,
        }
    }

    #[must_use]
    pub fn on(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    #[must_use]
    pub fn on_node(mut self, node: Option<NodeId>) -> Self {
        self.node = node;
        self
    }

    #[must_use]
    pub fn interval(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    #[must_use]
    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    #[must_use]
    pub fn pseudo(mut self) -> Self {
        self.pseudo = true;
        self
    }
}

// =============================================================================
// OPERATION DEFAULTS
// =============================================================================

/// Resolved failure handling and prerequisites of one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpPolicy {
    pub needs: Needs,
    pub on_fail: OnFail,
    pub fail_role: Role,
    pub timeout_ms: u64,
}

/// Resolve the policy of `task` at `interval_ms` on `rsc`, applying defaults.
#[must_use]
pub fn unpack_operation(model: &ClusterModel, rsc: &Resource, task: Task, interval_ms: u64) -> OpPolicy {
    let opts = &model.options;
    let op = rsc.find_op(task, interval_ms);

    let needs = match task {
        Task::Start | Task::Promote => op.and_then(|o| o.prereq).unwrap_or(
            match opts.no_quorum_policy {
                NoQuorumPolicy::Ignore => Needs::Nothing,
                NoQuorumPolicy::Freeze if opts.stonith_enabled => Needs::Fencing,
                _ => Needs::Quorum,
            },
        ),
        _ => Needs::Nothing,
    };

    let default_on_fail = match (task, rsc.stop_failure) {
        (Task::Stop, Some(StopFailurePolicy::Block)) => OnFail::Block,
        (Task::Stop, Some(StopFailurePolicy::Fence)) => OnFail::Fence,
        (Task::Stop, Some(StopFailurePolicy::Ignore)) => OnFail::Ignore,
        (Task::Stop, None) if opts.stonith_enabled => OnFail::Fence,
        (Task::Stop, None) => OnFail::Block,
        _ => OnFail::Restart,
    };
    let mut on_fail = op.and_then(|o| o.on_fail).unwrap_or(default_on_fail);
    if on_fail == OnFail::Fence && !opts.stonith_enabled {
        warn!(rsc = %rsc.name, task = %task, "on-fail=fence without fencing, using block");
        on_fail = OnFail::Block;
    }

    let fail_role = op.and_then(|o| o.role_after_failure).unwrap_or(match (on_fail, task) {
        (OnFail::Stop, _) => Role::Stopped,
        (_, Task::Promote) => Role::Slave,
        _ => Role::Started,
    });

    OpPolicy {
        needs,
        on_fail,
        fail_role,
        timeout_ms: op.map_or(DEFAULT_OP_TIMEOUT_MS, |o| o.timeout_ms),
    }
}

// =============================================================================
// ACTION TABLE
// =============================================================================

/// All actions of one pass, indexed by id and by deduplication key.
#[derive(Debug, Clone, Default)]
pub struct ActionTable {
    actions: Vec<Action>,
    by_key: BTreeMap<String, Vec<ActionId>>,
}

impl ActionTable {
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: ActionId) -> Option<&Action> {
        usize::try_from(id.0).ok().and_then(|i| self.actions.get(i))
    }

    pub fn get_mut(&mut self, id: ActionId) -> Option<&mut Action> {
        usize::try_from(id.0).ok().and_then(|i| self.actions.get_mut(i))
    }

    /// Like [`get`](Self::get), but a dangling id is an error.
    pub fn action(&self, id: ActionId) -> Result<&Action, PlacerError> {
        self.get(id).ok_or(PlacerError::UnknownAction(id))
    }

    pub fn action_mut(&mut self, id: ActionId) -> Result<&mut Action, PlacerError> {
        self.get_mut(id).ok_or(PlacerError::UnknownAction(id))
    }

    /// Actions in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }

    /// Action with `key` bound to `node`, or an unbound one.
    #[must_use]
    pub fn find(&self, key: &str, node: Option<NodeId>) -> Option<ActionId> {
        let ids = self.by_key.get(key)?;
        ids.iter()
            .copied()
            .find(|&id| self.get(id).is_some_and(|a| a.node == node))
            .or_else(|| {
                ids.iter()
                    .copied()
                    .find(|&id| self.get(id).is_some_and(|a| a.node.is_none() || node.is_none()))
            })
    }

    /// Every action of `resource` performing `task`, in id order.
    #[must_use]
    pub fn find_all(&self, resource: ResourceId, task: Task) -> Vec<ActionId> {
        self.actions
            .iter()
            .filter(|a| a.resource == Some(resource) && a.task == task)
            .map(|a| a.id)
            .collect()
    }

    /// Actions of any resource with `task` on `node`.
    #[must_use]
    pub fn on_node(&self, node: NodeId, task: Task) -> Vec<ActionId> {
        self.actions
            .iter()
            .filter(|a| a.node == Some(node) && a.task == task && a.resource.is_some())
            .map(|a| a.id)
            .collect()
    }

    /// Find or create the action described by `request`.
    ///
    /// An existing unbound action is bound to the requested node. Requesting
    /// a mandatory action makes an optional one mandatory.
    pub fn custom_action(&mut self, model: &mut ClusterModel, request: ActionRequest) -> ActionId {
        let owner = match request.resource {
            Some(r) => model.resource(r).name.clone(),
            None => request
                .node
                .map(|n| model.node(n).name.clone())
                .unwrap_or_default(),
        };
        let key = op_key(&owner, request.task.as_str(), request.interval_ms);

        if let Some(id) = self.find(&key, request.node) {
            let Some(action) = self.get_mut(id) else {
                return id;
            };
            if action.node.is_none() && request.node.is_some() {
                action.node = request.node;
                debug!(action = %id, key = %action.key, "bound to node");
            }
            if !request.optional {
                action.optional = false;
            }
            Self::update_runnable(model, action);
            return id;
        }

        let policy = request.resource.map(|r| {
            let rsc = model.resource(r);
            unpack_operation(model, rsc, request.task, request.interval_ms)
        });
        let id = ActionId(self.actions.len() as u64);
        let mut action = Action {
            id,
            resource: request.resource,
            node: request.node,
            task: request.task,
            key: key.clone(),
            interval_ms: request.interval_ms,
            timeout_ms: policy.map_or(DEFAULT_OP_TIMEOUT_MS, |p| p.timeout_ms),
            optional: request.optional,
            runnable: true,
            pseudo: request.pseudo,
            needs: policy.map_or(Needs::Nothing, |p| p.needs),
            on_fail: policy.map_or(OnFail::Ignore, |p| p.on_fail),
            fail_role: policy.map_or(Role::Stopped, |p| p.fail_role),
            meta: BTreeMap::new(),
            before: Vec::new(),
            after: Vec::new(),
        };
        Self::update_runnable(model, &mut action);
        debug!(
            action = %id,
            key = %key,
            optional = action.optional,
            runnable = action.runnable,
            "action created"
        );

        if let Some(r) = request.resource {
            model.resource_mut(r).actions.push(id);
        }
        self.by_key.entry(key).or_default().push(id);
        self.actions.push(action);
        id
    }

    /// Recompute `runnable`, and `optional` for unmanaged resources.
    ///
    /// A stop on an offline node cannot be confirmed, so the node is flagged
    /// unclean.
    pub fn update_runnable(model: &mut ClusterModel, action: &mut Action) {
        action.runnable = Self::is_runnable(model, action);
    }

    fn is_runnable(model: &mut ClusterModel, action: &mut Action) -> bool {
        let Some(r) = action.resource else {
            return true;
        };
        if action.pseudo {
            return true;
        }
        let Some(n) = action.node else {
            return false;
        };

        let (online, unclean) = {
            let node = model.node(n);
            (node.online, node.unclean)
        };
        let (managed, active) = {
            let rsc = model.resource(r);
            (rsc.is_managed, rsc.is_active())
        };
        if !managed && !(action.task == Task::Stop && unclean) {
            action.optional = true;
            return false;
        }
        if !online {
            if action.task == Task::Stop {
                model.node_mut(n).unclean = true;
            }
            return false;
        }
        if action.needs == Needs::Nothing {
            return true;
        }

        let opts = &model.options;
        if opts.have_quorum {
            return true;
        }
        match opts.no_quorum_policy {
            NoQuorumPolicy::Ignore => true,
            NoQuorumPolicy::Stop => false,
            NoQuorumPolicy::Freeze => !matches!(action.task, Task::Start | Task::Promote) && active,
        }
    }

    /// Order `first` before `then`.
    ///
    /// A pair ordered twice keeps one wrapper on each side with the stronger
    /// kind.
    pub fn order(&mut self, first: ActionId, then: ActionId, kind: OrderKind) -> Result<(), PlacerError> {
        if first == then {
            return Ok(());
        }
        self.action(then)?;
        let first_action = self.action_mut(first)?;
        Self::link(&mut first_action.after, then, kind);
        let then_action = self.action_mut(then)?;
        Self::link(&mut then_action.before, first, kind);
        Ok(())
    }

    fn link(list: &mut Vec<ActionWrapper>, other: ActionId, kind: OrderKind) {
        match list.iter_mut().find(|w| w.action == other) {
            Some(existing) if strength(kind) > strength(existing.kind) => existing.kind = kind,
            Some(_) => {}
            None => list.push(ActionWrapper {
                action: other,
                kind,
            }),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
