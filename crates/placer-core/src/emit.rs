//! # Graph Emitter
//!
//! Turns the ordered action table into the transition graph handed to the
//! executor.
//!
//! Only mandatory, runnable actions are emitted. Each becomes one synapse
//! whose inputs are the emitted actions ordered before it; synapses are
//! listed in a topological order of those inputs (ties broken by action id),
//! so the graph is byte-for-byte reproducible for a given snapshot.
//!
//! Mandatory actions that cannot run are reported separately instead of
//! being dropped silently.

use crate::context::SchedulingContext;
use crate::synth::Action;
use crate::types::{ActionId, PlacerError, Task};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

// =============================================================================
// GRAPH TYPES
// =============================================================================

/// An action as the executor sees it: names instead of arena handles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphAction {
    pub id: ActionId,
    pub key: String,
    pub task: Task,
    pub resource: Option<String>,
    pub node: Option<String>,
    pub interval_ms: u64,
    pub timeout_ms: u64,
    pub pseudo: bool,
    pub optional: bool,
    pub runnable: bool,
    /// Instance parameters of the resource.
    pub params: BTreeMap<String, String>,
    pub meta: BTreeMap<String, String>,
}

/// Actions that commit together, and the actions that trigger them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Synapse {
    pub id: u32,
    pub actions: Vec<GraphAction>,
    pub inputs: Vec<ActionId>,
}

impl Synapse {
    /// Pseudo synapses are never dispatched.
    #[must_use]
    pub fn is_pseudo(&self) -> bool {
        self.actions.iter().all(|a| a.pseudo)
    }
}

/// Output of one scheduling pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionGraph {
    pub transition_timeout_ms: u64,
    /// In topological order.
    pub synapses: Vec<Synapse>,
    /// Mandatory actions that could not be scheduled.
    pub unrunnable: Vec<GraphAction>,
}

impl TransitionGraph {
    #[must_use]
    pub fn action_count(&self) -> usize {
        self.synapses.iter().map(|s| s.actions.len()).sum()
    }

    /// Every emitted action, in synapse order.
    pub fn actions(&self) -> impl Iterator<Item = &GraphAction> {
        self.synapses.iter().flat_map(|s| s.actions.iter())
    }

    /// First emitted action with `key` on `node`.
    #[must_use]
    pub fn find(&self, key: &str, node: Option<&str>) -> Option<&GraphAction> {
        self.actions()
            .find(|a| a.key == key && a.node.as_deref() == node)
    }

    /// Synapse holding action `id`.
    #[must_use]
    pub fn synapse_of(&self, id: ActionId) -> Option<&Synapse> {
        self.synapses
            .iter()
            .find(|s| s.actions.iter().any(|a| a.id == id))
    }

    /// Synapses the executor may dispatch once `completed` have been
    /// confirmed.
    ///
    /// Pseudo synapses complete as soon as their own inputs have, so they are
    /// never returned; real synapses already confirmed are not returned either.
    #[must_use]
    pub fn ready_synapses(&self, completed: &BTreeSet<ActionId>) -> Vec<&Synapse> {
        let mut done = completed.clone();
        let mut ready = Vec::new();
        for synapse in &self.synapses {
            let triggered = synapse.inputs.iter().all(|i| done.contains(i));
            if synapse.is_pseudo() {
                if triggered {
                    done.extend(synapse.actions.iter().map(|a| a.id));
                }
                continue;
            }
            let confirmed = synapse.actions.iter().all(|a| completed.contains(&a.id));
            if triggered && !confirmed {
                ready.push(synapse);
            }
        }
        ready
    }
}

// =============================================================================
// EMITTER
// =============================================================================

/// Builds the [`TransitionGraph`] from a fully ordered context.
pub struct GraphEmitter;

impl GraphEmitter {
    pub fn emit(ctx: &SchedulingContext) -> Result<TransitionGraph, PlacerError> {
        let emitted: BTreeSet<ActionId> = ctx
            .actions
            .iter()
            .filter(|a| a.is_mandatory() && a.runnable)
            .map(|a| a.id)
            .collect();

        let mut inputs: BTreeMap<ActionId, Vec<ActionId>> = BTreeMap::new();
        let mut pending: BTreeMap<ActionId, usize> = BTreeMap::new();
        let mut successors: BTreeMap<ActionId, Vec<ActionId>> = BTreeMap::new();
        for &id in &emitted {
            let action = ctx.actions.action(id)?;
            let mut before: Vec<ActionId> = action
                .before
                .iter()
                .map(|w| w.action)
                .filter(|b| emitted.contains(b))
                .collect();
            before.sort_unstable();
            before.dedup();
            for &b in &before {
                successors.entry(b).or_default().push(id);
            }
            pending.insert(id, before.len());
            inputs.insert(id, before);
        }

        let mut ready: BTreeSet<ActionId> = pending
            .iter()
            .filter(|&(_, &n)| n == 0)
            .map(|(&id, _)| id)
            .collect();
        let mut synapses = Vec::with_capacity(emitted.len());
        while let Some(id) = ready.pop_first() {
            let action = ctx.actions.action(id)?;
            synapses.push(Synapse {
                id: synapses.len() as u32,
                actions: vec![Self::graph_action(ctx, action)],
                inputs: inputs.remove(&id).unwrap_or_default(),
            });
            for &next in successors.get(&id).map(Vec::as_slice).unwrap_or_default() {
                if let Some(count) = pending.get_mut(&next) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.insert(next);
                    }
                }
            }
        }
        if synapses.len() < emitted.len() {
            let stuck = inputs.keys().next().copied().unwrap_or(ActionId(0));
            return Err(PlacerError::OrderingCycle(stuck));
        }

        let mut unrunnable = Vec::new();
        for action in ctx.actions.iter().filter(|a| a.is_mandatory() && !a.runnable) {
            warn!(action = %action.id, key = %action.key, "mandatory action cannot run");
            unrunnable.push(Self::graph_action(ctx, action));
        }

        info!(
            synapses = synapses.len(),
            unrunnable = unrunnable.len(),
            "transition graph emitted"
        );
        Ok(TransitionGraph {
            transition_timeout_ms: ctx.model.options.transition_timeout_ms,
            synapses,
            unrunnable,
        })
    }

    fn graph_action(ctx: &SchedulingContext, action: &Action) -> GraphAction {
        let rsc = action.resource.map(|r| ctx.model.resource(r));
        let params = match rsc {
            Some(rsc) if !action.pseudo => rsc.params.clone(),
            _ => BTreeMap::new(),
        };
        debug!(action = %action.id, key = %action.key, pseudo = action.pseudo, "emit");
        GraphAction {
            id: action.id,
            key: action.key.clone(),
            task: action.task,
            resource: rsc.map(|r| r.name.clone()),
            node: action.node.map(|n| ctx.model.node(n).name.clone()),
            interval_ms: action.interval_ms,
            timeout_ms: action.timeout_ms,
            pseudo: action.pseudo,
            optional: action.optional,
            runnable: action.runnable,
            params,
            meta: action.meta.clone(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
