//! # Scenario Tier Tests (T0-T6)
//!
//! End-to-end passes over small clusters. If ANY tier fails, the scheduler
//! is INVALID.
//!
//! ## Tiers
//! - T0: Score arithmetic
//! - T1: Allocation and colocation
//! - T2: History replay and failure policy
//! - T3: Ordering and graph emission
//! - T4: Quorum loss and orphans
//! - T5: Groups and clones
//! - T6: Fencing and recovery

use placer_core::{
    ClusterSnapshot, GraphAction, PassOutput, PlacerError, Role, Score, Task, TransitionGraph,
    prepare, schedule,
};
use serde_json::{Value, json};
use std::collections::BTreeSet;

fn snapshot(value: Value) -> ClusterSnapshot {
    serde_json::from_value(value).expect("snapshot")
}

fn run(value: Value) -> PassOutput {
    schedule(&snapshot(value)).expect("pass")
}

fn online(nodes: &[&str]) -> Value {
    Value::Array(
        nodes
            .iter()
            .map(|n| json!({"node": n, "online": true}))
            .collect(),
    )
}

fn nodes(ids: &[&str]) -> Value {
    Value::Array(ids.iter().map(|n| json!({"id": n})).collect())
}

fn primitive(id: &str) -> Value {
    json!({"kind": "primitive", "id": id, "type": "Dummy"})
}

fn started(rsc: &str, node: &str) -> Value {
    json!({
        "resource": rsc, "node": node, "type": "Dummy",
        "ops": [{"task": "start", "call_id": 1, "status": "done"}]
    })
}

fn location(id: &str, rsc: &str, node: &str, score: Value) -> Value {
    json!({"id": id, "resource": rsc, "node": node, "score": score})
}

fn action<'a>(graph: &'a TransitionGraph, rsc: &str, task: Task, node: Option<&str>) -> &'a GraphAction {
    graph
        .actions()
        .find(|a| a.resource.as_deref() == Some(rsc) && a.task == task && a.node.as_deref() == node)
        .expect("action in graph")
}

fn inputs_of(graph: &TransitionGraph, id: placer_core::ActionId) -> Vec<placer_core::ActionId> {
    graph.synapse_of(id).expect("synapse").inputs.clone()
}

// =============================================================================
// TIER T0: SCORE ARITHMETIC
// =============================================================================

mod t0_score {
    use super::*;

    /// T0.1: Opposing infinities are a conflict, not a crash.
    #[test]
    fn opposing_infinities_conflict() {
        assert!(matches!(
            Score::INFINITY.checked_merge(Score::NEG_INFINITY),
            Err(PlacerError::ScoreConflict)
        ));
        assert_eq!(Score::INFINITY.merge(Score::NEG_INFINITY), Score::NEG_INFINITY);
    }

    /// T0.2: Sentinel strings parse in snapshots.
    #[test]
    fn sentinel_scores_in_snapshot() {
        let out = run(json!({
            "nodes": nodes(&["a", "b"]),
            "status": online(&["a", "b"]),
            "resources": [primitive("r")],
            "constraints": {"locations": [location("ban", "r", "a", json!("-INFINITY"))]}
        }));
        assert_eq!(out.placement["r"].as_deref(), Some("b"));
    }
}

// =============================================================================
// TIER T1: ALLOCATION
// =============================================================================

mod t1_allocation {
    use super::*;

    /// T1.1: The heavier node wins.
    #[test]
    fn highest_weight_node_wins() {
        let out = run(json!({
            "nodes": nodes(&["a", "b"]),
            "status": online(&["a", "b"]),
            "resources": [primitive("r")],
            "constraints": {"locations": [
                location("pa", "r", "a", json!(100)),
                location("pb", "r", "b", json!(50))
            ]}
        }));
        assert_eq!(out.placement["r"].as_deref(), Some("a"));
    }

    /// T1.2: A `must` colocation pulls the partner onto the only viable node.
    #[test]
    fn must_colocation_follows_restricted_partner() {
        let out = run(json!({
            "nodes": nodes(&["a", "b"]),
            "status": online(&["a", "b"]),
            "resources": [primitive("r"), primitive("s")],
            "constraints": {
                "locations": [
                    location("r-not-b", "r", "b", json!("-INFINITY")),
                    location("s-likes-b", "s", "b", json!(10))
                ],
                "colocations": [{"id": "r-with-s", "resource": "r", "with": "s", "strength": "must"}]
            }
        }));
        assert_eq!(out.placement["r"].as_deref(), Some("a"));
        assert_eq!(out.placement["s"].as_deref(), Some("a"));
    }

    /// T1.3: A `must-not` colocation pushes the partner elsewhere.
    #[test]
    fn must_not_colocation_excludes_node() {
        let mut r = primitive("r");
        r["priority"] = json!(10);
        let out = run(json!({
            "nodes": nodes(&["a", "b"]),
            "status": online(&["a", "b"]),
            "resources": [r, primitive("s")],
            "constraints": {
                "locations": [location("r-on-a", "r", "b", json!("-INFINITY"))],
                "colocations": [{"id": "apart", "resource": "r", "with": "s", "strength": "must-not"}]
            }
        }));
        assert_eq!(out.placement["r"].as_deref(), Some("a"));
        assert_eq!(out.placement["s"].as_deref(), Some("b"));
    }

    /// T1.4: With no node left the partner stays unassigned.
    #[test]
    fn must_not_without_room_leaves_unassigned() {
        let mut r = primitive("r");
        r["priority"] = json!(10);
        let out = run(json!({
            "nodes": nodes(&["a"]),
            "status": online(&["a"]),
            "resources": [r, primitive("s")],
            "constraints": {
                "colocations": [{"id": "apart", "resource": "r", "with": "s", "strength": "must-not"}]
            }
        }));
        assert_eq!(out.placement["r"].as_deref(), Some("a"));
        assert_eq!(out.placement["s"], None);
        assert_eq!(out.roles["s"], Role::Stopped);
        assert!(!out.diagnostics.has_errors());
    }

    /// T1.5: Equal weights spread by load.
    #[test]
    fn equal_weights_balance_load() {
        let out = run(json!({
            "nodes": nodes(&["a", "b"]),
            "status": online(&["a", "b"]),
            "resources": [primitive("r"), primitive("s")]
        }));
        assert_eq!(out.placement["r"].as_deref(), Some("a"));
        assert_eq!(out.placement["s"].as_deref(), Some("b"));
    }

    /// T1.6: Unknown colocation partners are skipped with a config error.
    #[test]
    fn unknown_partner_is_config_error() {
        let out = run(json!({
            "nodes": nodes(&["a"]),
            "status": online(&["a"]),
            "resources": [primitive("r")],
            "constraints": {
                "colocations": [{"id": "c", "resource": "r", "with": "ghost", "strength": "must"}]
            }
        }));
        assert_eq!(out.placement["r"].as_deref(), Some("a"));
        assert_eq!(out.diagnostics.config_errors.len(), 1);
    }
}

// =============================================================================
// TIER T2: HISTORY REPLAY
// =============================================================================

mod t2_history {
    use super::*;

    fn fenced_start(managed: bool) -> Value {
        json!({
            "options": {"stonith_enabled": true},
            "nodes": nodes(&["a", "b"]),
            "status": online(&["a", "b"]),
            "resources": [{
                "kind": "primitive", "id": "r", "type": "Dummy", "is_managed": managed,
                "operations": [{"name": "start", "on_fail": "fence"}]
            }],
            "history": [{
                "resource": "r", "node": "a", "type": "Dummy",
                "ops": [{"task": "start", "call_id": 3, "status": "error", "rc": 1}]
            }]
        })
    }

    /// T2.1: A start failing with `on_fail=fence` marks the node unclean.
    #[test]
    fn fence_policy_marks_node_unclean() {
        let snap = snapshot(fenced_start(true));
        let ctx = prepare(&snap, snap.options.clone()).expect("prepare");
        let a = ctx.model.find_node("a").expect("a");
        assert!(ctx.model.node(a).unclean);
        assert_eq!(ctx.diagnostics.processing_warnings.len(), 1);
    }

    /// T2.2: ...and its stop is scheduled whether or not it is managed.
    #[test]
    fn fence_policy_stops_regardless_of_management() {
        for managed in [true, false] {
            let out = run(fenced_start(managed));
            let stop = action(&out.graph, "r", Task::Stop, Some("a"));
            assert!(stop.runnable);
            assert!(!stop.optional);
            let fence = out
                .graph
                .actions()
                .find(|a| a.task == Task::Fence)
                .expect("fence");
            assert_eq!(fence.node.as_deref(), Some("a"));
            assert!(inputs_of(&out.graph, fence.id).contains(&stop.id));
        }
    }

    /// T2.3: The managed resource restarts elsewhere after the fence.
    #[test]
    fn managed_resource_recovers_on_other_node() {
        let out = run(fenced_start(true));
        assert_eq!(out.placement["r"].as_deref(), Some("b"));
        let start = action(&out.graph, "r", Task::Start, Some("b"));
        let stop = action(&out.graph, "r", Task::Stop, Some("a"));
        assert!(inputs_of(&out.graph, start.id).contains(&stop.id));
    }

    /// T2.4: A failed monitor restarts in place.
    #[test]
    fn failed_monitor_restarts_in_place() {
        let out = run(json!({
            "options": {"default_resource_stickiness": 100},
            "nodes": nodes(&["a", "b"]),
            "status": online(&["a", "b"]),
            "resources": [{
                "kind": "primitive", "id": "r", "type": "Dummy",
                "operations": [{"name": "monitor", "interval_ms": 5000}]
            }],
            "history": [{
                "resource": "r", "node": "a", "type": "Dummy",
                "ops": [
                    {"task": "start", "call_id": 1, "status": "done"},
                    {"task": "monitor", "interval_ms": 5000, "call_id": 2, "status": "error", "rc": 1}
                ]
            }]
        }));
        assert_eq!(out.placement["r"].as_deref(), Some("a"));
        let stop = action(&out.graph, "r", Task::Stop, Some("a"));
        let start = action(&out.graph, "r", Task::Start, Some("a"));
        assert!(inputs_of(&out.graph, start.id).contains(&stop.id));
    }

    /// T2.5: A reused call id aborts the pass.
    #[test]
    fn duplicate_call_id_aborts() {
        let result = schedule(&snapshot(json!({
            "nodes": nodes(&["a"]),
            "status": online(&["a"]),
            "resources": [primitive("r")],
            "history": [{
                "resource": "r", "node": "a", "type": "Dummy",
                "ops": [
                    {"task": "start", "call_id": 4, "status": "done"},
                    {"task": "stop", "call_id": 4, "status": "done"}
                ]
            }]
        })));
        assert!(matches!(result, Err(PlacerError::InvalidCallId { call_id: 4, .. })));
    }

    /// T2.6: A start still in flight is confirmed, not restarted.
    #[test]
    fn pending_start_is_not_restarted() {
        let out = run(json!({
            "options": {"default_resource_stickiness": 100},
            "nodes": nodes(&["a", "b"]),
            "status": online(&["a", "b"]),
            "resources": [primitive("r")],
            "history": [{
                "resource": "r", "node": "a", "type": "Dummy",
                "ops": [{
                    "task": "start", "call_id": -1, "status": "pending",
                    "transition_magic": "0:0;12:4:abc"
                }]
            }]
        }));
        assert_eq!(out.placement["r"].as_deref(), Some("a"));
        assert!(!out.graph.actions().any(|a| a.task == Task::Stop));
        let start = action(&out.graph, "r", Task::Start, Some("a"));
        assert!(inputs_of(&out.graph, start.id).is_empty());
    }

    fn migrating_monitor() -> Value {
        json!({
            "nodes": nodes(&["a", "b"]),
            "status": online(&["a", "b"]),
            "resources": [{
                "kind": "primitive", "id": "r", "type": "Dummy",
                "operations": [{"name": "monitor", "interval_ms": 10000, "on_fail": "migrate"}]
            }],
            "history": [{
                "resource": "r", "node": "a", "type": "Dummy",
                "ops": [
                    {"task": "start", "call_id": 1, "status": "done"},
                    {"task": "monitor", "interval_ms": 10000, "call_id": 2, "status": "error", "rc": 1}
                ]
            }]
        })
    }

    /// T2.7: A monitor failing with `on_fail=migrate` bans the node.
    #[test]
    fn migrate_policy_bans_failed_node() {
        let snap = snapshot(migrating_monitor());
        let ctx = prepare(&snap, snap.options.clone()).expect("prepare");
        let a = ctx.model.find_node("a").expect("a");
        let r = ctx.model.find_resource("r").expect("r");
        assert!(ctx.model.locations.iter().any(|l| l.id == "r-migrate-a"));
        assert!(
            !ctx.model
                .resource(r)
                .allowed
                .get(a)
                .is_some_and(|n| n.is_eligible())
        );
    }

    /// T2.8: ...and the resource moves with its monitor.
    #[test]
    fn migrate_policy_moves_resource() {
        let out = run(migrating_monitor());
        assert_eq!(out.placement["r"].as_deref(), Some("b"));
        let stop = action(&out.graph, "r", Task::Stop, Some("a"));
        let start = action(&out.graph, "r", Task::Start, Some("b"));
        let monitor = action(&out.graph, "r", Task::Monitor, Some("b"));
        assert!(inputs_of(&out.graph, start.id).contains(&stop.id));
        assert!(inputs_of(&out.graph, monitor.id).contains(&start.id));
        assert!(
            !out.graph
                .actions()
                .any(|a| a.task == Task::Monitor && a.node.as_deref() == Some("a"))
        );
    }

    /// T2.9: A failed promote falls back to slave in place.
    #[test]
    fn failed_promote_demotes_without_restart() {
        let out = run(json!({
            "options": {"default_resource_stickiness": 100},
            "nodes": nodes(&["a", "b"]),
            "status": online(&["a", "b"]),
            "resources": [primitive("r")],
            "history": [{
                "resource": "r", "node": "a", "type": "Dummy",
                "ops": [
                    {"task": "start", "call_id": 1, "status": "done"},
                    {"task": "promote", "call_id": 2, "status": "error", "rc": 1}
                ]
            }]
        }));
        assert_eq!(out.placement["r"].as_deref(), Some("a"));
        assert_eq!(out.roles["r"], Role::Slave);
        let demote = action(&out.graph, "r", Task::Demote, Some("a"));
        assert!(demote.runnable);
        assert!(
            !out.graph
                .actions()
                .any(|a| matches!(a.task, Task::Stop | Task::Start | Task::Promote))
        );
    }
}

// =============================================================================
// TIER T3: ORDERING & EMISSION
// =============================================================================

mod t3_ordering {
    use super::*;

    fn ordered() -> PassOutput {
        run(json!({
            "nodes": nodes(&["a", "b"]),
            "status": [
                {"node": "a", "online": true, "standby": true},
                {"node": "b", "online": true}
            ],
            "resources": [primitive("r"), primitive("s")],
            "constraints": {"orderings": [{
                "id": "r-then-s", "first": "r", "first_action": "stop",
                "then": "s", "then_action": "start",
                "kind": "mandatory", "symmetrical": false
            }]},
            "history": [started("r", "a")]
        }))
    }

    /// T3.1: `stop(r)` appears among the inputs of `start(s)`.
    #[test]
    fn mandatory_ordering_becomes_input() {
        let out = ordered();
        let stop = action(&out.graph, "r", Task::Stop, Some("a"));
        let start = action(&out.graph, "s", Task::Start, Some("b"));
        assert!(inputs_of(&out.graph, start.id).contains(&stop.id));
    }

    /// T3.2: `start(s)` is not triggerable until `stop(r)` completes.
    #[test]
    fn synapse_waits_for_input() {
        let out = ordered();
        let stop = action(&out.graph, "r", Task::Stop, Some("a")).id;
        let start = action(&out.graph, "s", Task::Start, Some("b")).id;

        let ready: Vec<_> = out
            .graph
            .ready_synapses(&BTreeSet::new())
            .iter()
            .flat_map(|s| s.actions.iter().map(|a| a.id))
            .collect();
        assert!(ready.contains(&stop));
        assert!(!ready.contains(&start));

        let ready: Vec<_> = out
            .graph
            .ready_synapses(&BTreeSet::from([stop]))
            .iter()
            .flat_map(|s| s.actions.iter().map(|a| a.id))
            .collect();
        assert!(ready.contains(&start));
    }

    /// T3.3: Synapses are listed after all of their inputs.
    #[test]
    fn synapses_are_topologically_sorted() {
        let out = ordered();
        let mut seen = BTreeSet::new();
        for synapse in &out.graph.synapses {
            assert!(synapse.inputs.iter().all(|i| seen.contains(i)));
            seen.extend(synapse.actions.iter().map(|a| a.id));
        }
    }

    /// T3.4: Symmetric orderings also order the inverse tasks.
    #[test]
    fn symmetric_ordering_orders_stops_in_reverse() {
        let out = run(json!({
            "options": {"have_quorum": false, "no_quorum_policy": "stop"},
            "nodes": nodes(&["a"]),
            "status": online(&["a"]),
            "resources": [primitive("r"), primitive("s")],
            "constraints": {"orderings": [{
                "id": "r-then-s", "first": "r", "then": "s", "kind": "mandatory"
            }]},
            "history": [started("r", "a"), started("s", "a")]
        }));
        let stop_r = action(&out.graph, "r", Task::Stop, Some("a"));
        let stop_s = action(&out.graph, "s", Task::Stop, Some("a"));
        assert!(inputs_of(&out.graph, stop_r.id).contains(&stop_s.id));
    }
}

// =============================================================================
// TIER T4: QUORUM LOSS & ORPHANS
// =============================================================================

mod t4_quorum {
    use super::*;

    /// T4.1: `no_quorum_policy=stop` stops everything that runs.
    #[test]
    fn stop_policy_stops_resources() {
        let out = run(json!({
            "options": {"have_quorum": false},
            "nodes": nodes(&["a"]),
            "status": online(&["a"]),
            "resources": [primitive("r")],
            "history": [started("r", "a")]
        }));
        assert!(action(&out.graph, "r", Task::Stop, Some("a")).runnable);
        assert_eq!(out.graph.action_count(), 1);
    }

    /// T4.2: Under `freeze`, an orphan found running is still stopped, its
    /// recurring monitor is cancelled first, and no monitor is scheduled.
    #[test]
    fn frozen_partition_still_stops_orphans() {
        let out = run(json!({
            "options": {"have_quorum": false, "no_quorum_policy": "freeze"},
            "nodes": nodes(&["a"]),
            "status": online(&["a"]),
            "history": [{
                "resource": "ghost", "node": "a", "type": "Dummy",
                "ops": [
                    {"task": "start", "call_id": 1, "status": "done"},
                    {"task": "monitor", "interval_ms": 10000, "call_id": 2, "status": "done"}
                ]
            }]
        }));
        assert_eq!(out.placement["ghost"], None);
        let stop = action(&out.graph, "ghost", Task::Stop, Some("a"));
        let cancel = action(&out.graph, "ghost", Task::Cancel, Some("a"));
        assert_eq!(cancel.meta["operation"], "monitor");
        assert_eq!(cancel.interval_ms, 10_000);
        assert!(inputs_of(&out.graph, stop.id).contains(&cancel.id));
        assert!(out.graph.actions().all(|a| a.task != Task::Monitor));
    }

    /// T4.3: Under `freeze`, new resources do not start.
    #[test]
    fn frozen_partition_does_not_start() {
        let out = run(json!({
            "options": {"have_quorum": false, "no_quorum_policy": "freeze"},
            "nodes": nodes(&["a"]),
            "status": online(&["a"]),
            "resources": [primitive("r")]
        }));
        assert!(out.graph.synapses.is_empty());
        assert_eq!(out.graph.unrunnable.len(), 1);
        assert_eq!(out.graph.unrunnable[0].task, Task::Start);
    }

    /// T4.4: Orphans are left alone when orphan stopping is off.
    #[test]
    fn orphans_kept_when_not_stopping() {
        let out = run(json!({
            "options": {"stop_orphan_resources": false, "stop_orphan_actions": false},
            "nodes": nodes(&["a"]),
            "status": online(&["a"]),
            "history": [started("ghost", "a")]
        }));
        assert_eq!(out.placement["ghost"].as_deref(), Some("a"));
        assert!(out.graph.synapses.is_empty());
    }
}

// =============================================================================
// TIER T5: GROUPS & CLONES
// =============================================================================

mod t5_containers {
    use super::*;

    /// T5.1: Group children share a node and start in sequence.
    #[test]
    fn group_children_start_in_order() {
        let out = run(json!({
            "nodes": nodes(&["a", "b"]),
            "status": online(&["a", "b"]),
            "resources": [{"kind": "group", "id": "g", "children": [
                {"id": "g1", "type": "Dummy"},
                {"id": "g2", "type": "Dummy"}
            ]}]
        }));
        assert_eq!(out.placement["g1"], out.placement["g2"]);
        let node = out.placement["g1"].as_deref();
        let g1 = action(&out.graph, "g1", Task::Start, node);
        let g2 = action(&out.graph, "g2", Task::Start, node);
        assert!(inputs_of(&out.graph, g2.id).contains(&g1.id));

        let running = action(&out.graph, "g", Task::Running, None);
        assert!(running.pseudo);
        let inputs = inputs_of(&out.graph, running.id);
        assert!(inputs.contains(&g1.id) && inputs.contains(&g2.id));
    }

    /// T5.2: Clone instances never share a node.
    #[test]
    fn clone_instances_spread() {
        let out = run(json!({
            "nodes": nodes(&["a", "b"]),
            "status": online(&["a", "b"]),
            "resources": [{"kind": "clone", "id": "c", "clone_max": 2,
                "template": {"id": "c", "type": "Dummy"}}]
        }));
        assert_eq!(out.placement["c:0"].as_deref(), Some("a"));
        assert_eq!(out.placement["c:1"].as_deref(), Some("b"));
    }

    /// T5.3: Anonymous clone history lands on a free instance.
    #[test]
    fn anonymous_clone_history_is_remapped() {
        let out = run(json!({
            "options": {"default_resource_stickiness": 100},
            "nodes": nodes(&["a", "b"]),
            "status": online(&["a", "b"]),
            "resources": [{"kind": "clone", "id": "c", "clone_max": 2,
                "template": {"id": "c", "type": "Dummy"}}],
            "history": [started("c", "b")]
        }));
        assert_eq!(out.placement["c:0"].as_deref(), Some("b"));
        assert_eq!(out.placement["c:1"].as_deref(), Some("a"));
        assert!(out.graph.actions().all(|a| a.task != Task::Stop));
    }
}

// =============================================================================
// TIER T6: FENCING & RECOVERY
// =============================================================================

mod t6_recovery {
    use super::*;

    /// T6.1: Resources on a lost node are recovered after it is fenced.
    #[test]
    fn offline_unclean_node_is_fenced_first() {
        let out = run(json!({
            "options": {"stonith_enabled": true},
            "nodes": nodes(&["a", "b"]),
            "status": [
                {"node": "a", "online": true},
                {"node": "b", "online": false, "unclean": true}
            ],
            "resources": [primitive("r")],
            "history": [started("r", "b")]
        }));
        assert_eq!(out.placement["r"].as_deref(), Some("a"));
        let fence = out.graph.actions().find(|a| a.task == Task::Fence).expect("fence");
        assert_eq!(fence.node.as_deref(), Some("b"));
        let stop = action(&out.graph, "r", Task::Stop, Some("b"));
        assert!(stop.pseudo);
        assert_eq!(inputs_of(&out.graph, stop.id), vec![fence.id]);
        let start = action(&out.graph, "r", Task::Start, Some("a"));
        let inputs = inputs_of(&out.graph, start.id);
        assert!(inputs.contains(&fence.id) && inputs.contains(&stop.id));
    }

    /// T6.2: Without fencing the stop on a lost node cannot run.
    #[test]
    fn lost_node_without_fencing_blocks() {
        let out = run(json!({
            "nodes": nodes(&["a", "b"]),
            "status": online(&["a"]),
            "resources": [primitive("r")],
            "history": [started("r", "b")]
        }));
        assert!(out.graph.unrunnable.iter().any(|a| a.task == Task::Stop));
        assert!(!out.diagnostics.processing_warnings.is_empty());
    }

    /// T6.3: Active on two nodes: stop both, start once.
    #[test]
    fn multiple_active_stop_start() {
        let out = run(json!({
            "nodes": nodes(&["a", "b"]),
            "status": online(&["a", "b"]),
            "resources": [primitive("r")],
            "history": [started("r", "a"), started("r", "b")]
        }));
        assert!(out.diagnostics.has_errors());
        let stop_a = action(&out.graph, "r", Task::Stop, Some("a"));
        let stop_b = action(&out.graph, "r", Task::Stop, Some("b"));
        let start = action(&out.graph, "r", Task::Start, Some("a"));
        let inputs = inputs_of(&out.graph, start.id);
        assert!(inputs.contains(&stop_a.id) && inputs.contains(&stop_b.id));
    }

    /// T6.4: A shutting-down node hands its resources over.
    #[test]
    fn shutdown_moves_resources() {
        let out = run(json!({
            "nodes": nodes(&["a", "b"]),
            "status": [
                {"node": "a", "online": true, "shutdown": true},
                {"node": "b", "online": true}
            ],
            "resources": [primitive("r")],
            "history": [started("r", "a")]
        }));
        assert_eq!(out.placement["r"].as_deref(), Some("b"));
        let stop = action(&out.graph, "r", Task::Stop, Some("a"));
        let shutdown = out
            .graph
            .actions()
            .find(|a| a.task == Task::Shutdown)
            .expect("shutdown");
        assert!(inputs_of(&out.graph, shutdown.id).contains(&stop.id));
    }
}
