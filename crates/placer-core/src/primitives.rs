//! # Scheduler Primitives
//!
//! Hardcoded constants shared by every phase of a scheduling pass.
//!
//! These values are part of the contract with the external collaborators
//! (the status unpacker and the transition executor) and are immutable at
//! runtime.

/// Magnitude of the `+INFINITY` / `-INFINITY` score sentinels.
///
/// Any finite score is clamped into `[-INFINITY, INFINITY]`; reaching either
/// bound makes the value absorbing.
pub const INFINITY: i64 = 1_000_000;

/// Textual forms accepted for the positive sentinel.
pub const INFINITY_TOKENS: [&str; 2] = ["INFINITY", "+INFINITY"];

/// Textual form accepted for the negative sentinel.
pub const NEG_INFINITY_TOKEN: &str = "-INFINITY";

// =============================================================================
// RESOURCE AGENT RETURN CODES
// =============================================================================

/// Agent reported success.
pub const RC_OK: i32 = 0;

/// Agent reported the resource is not running.
///
/// Forces the replayed role back to `stopped`.
pub const RC_NOT_RUNNING: i32 = 7;

/// Agent reported the resource is running as master.
pub const RC_RUNNING_MASTER: i32 = 8;

/// Agent reported a failure while running as master.
///
/// The role is forced to `master` and the result counts as an error.
pub const RC_FAILED_MASTER: i32 = 9;

// =============================================================================
// BUILT-IN NODE ATTRIBUTES
// =============================================================================

/// Node attribute holding the node's name.
pub const ATTR_UNAME: &str = "#uname";

/// Node attribute holding the node's id.
pub const ATTR_ID: &str = "#id";

/// Node attribute set to `"true"` on the designated coordinator.
pub const ATTR_IS_DC: &str = "#is_dc";

// =============================================================================
// OPERATION DEFAULTS
// =============================================================================

/// Timeout applied to operations without an explicit definition.
pub const DEFAULT_OP_TIMEOUT_MS: u64 = 20_000;

/// Timeout the transition executor is given for a whole graph.
pub const DEFAULT_TRANSITION_TIMEOUT_MS: u64 = 60_000;

/// Transition id that marks an operation issued during node shutdown.
///
/// Pending operations carrying it sort after every other pending operation.
pub const SHUTDOWN_TRANSITION_ID: i64 = -1;

/// Build the deduplication key of an operation: `<resource>_<task>_<interval>`.
#[must_use]
pub fn op_key(resource: &str, task: &str, interval_ms: u64) -> String {
    format!("{}_{}_{}", resource, task, interval_ms)
}
