//! # Scheduling Pass
//!
//! One call turns a [`ClusterSnapshot`] into a [`TransitionGraph`]:
//!
//! ```text
//! snapshot -> model -> history replay -> candidates -> colors
//!          -> actions -> orderings -> synapses
//! ```
//!
//! Recoverable problems are collected in [`Diagnostics`]; only invariant
//! violations abort the pass, and then no graph is returned at all.

use crate::allocate::ColoringAllocator;
use crate::config::ClusterOptions;
use crate::context::{Diagnostics, SchedulingContext};
use crate::emit::{GraphEmitter, TransitionGraph};
use crate::input::ClusterSnapshot;
use crate::model::ModelBuilder;
use crate::order::OrderingBuilder;
use crate::placement::PlacementEngine;
use crate::synth::{ActionSynthesizer, HistoryReplayer};
use crate::types::{PlacerError, Role};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{error, info};

/// Result of a successful pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassOutput {
    pub graph: TransitionGraph,
    /// Primitive name to chosen node name; `None` means stopped.
    pub placement: BTreeMap<String, Option<String>>,
    /// Role each primitive is driven toward.
    pub roles: BTreeMap<String, Role>,
    pub diagnostics: Diagnostics,
}

/// Schedule with the options embedded in the snapshot.
pub fn schedule(snapshot: &ClusterSnapshot) -> Result<PassOutput, PlacerError> {
    schedule_with(snapshot, snapshot.options.clone())
}

/// Schedule with explicit options, ignoring the snapshot's own.
pub fn schedule_with(
    snapshot: &ClusterSnapshot,
    options: ClusterOptions,
) -> Result<PassOutput, PlacerError> {
    let mut ctx = prepare(snapshot, options)?;
    let assignment = ColoringAllocator::allocate(&mut ctx).inspect_err(abort)?;
    ActionSynthesizer::synthesize_all(&mut ctx).inspect_err(abort)?;
    OrderingBuilder::order(&mut ctx).inspect_err(abort)?;
    let graph = GraphEmitter::emit(&ctx).inspect_err(abort)?;

    let placement = assignment
        .iter()
        .map(|(&r, &node)| {
            (
                ctx.model.resource(r).name.clone(),
                node.map(|n| ctx.model.node(n).name.clone()),
            )
        })
        .collect();
    let roles = assignment
        .keys()
        .map(|&r| {
            let rsc = ctx.model.resource(r);
            let role = if rsc.assigned.is_some() {
                rsc.next_role
            } else {
                Role::Stopped
            };
            (rsc.name.clone(), role)
        })
        .collect();

    info!(
        synapses = graph.synapses.len(),
        unrunnable = graph.unrunnable.len(),
        errors = ctx.diagnostics.has_errors(),
        "scheduling pass complete"
    );
    Ok(PassOutput {
        graph,
        placement,
        roles,
        diagnostics: ctx.diagnostics,
    })
}

/// Build the model, replay history and compute candidate lists.
///
/// Exposed for callers that drive the later phases themselves.
pub fn prepare(
    snapshot: &ClusterSnapshot,
    options: ClusterOptions,
) -> Result<SchedulingContext, PlacerError> {
    let mut diagnostics = Diagnostics::default();
    let model = ModelBuilder::build(snapshot, options, &mut diagnostics);
    let mut ctx = SchedulingContext::new(model, diagnostics);
    HistoryReplayer::replay(&mut ctx).inspect_err(abort)?;
    PlacementEngine::apply(&mut ctx);
    Ok(ctx)
}

fn abort(err: &PlacerError) {
    error!(error = %err, "scheduling pass aborted");
}

// =============================================================================
// TESTS
// =============================================================================
