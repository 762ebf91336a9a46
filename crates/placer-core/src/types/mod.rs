//! # Core Type Definitions
//!
//! This module contains the closed vocabulary of the scheduler:
//! - Arena handles (`NodeId`, `ResourceId`, `ColorId`, `ActionId`)
//! - Roles and tasks (`Role`, `Task`)
//! - Policy enums read from configuration
//! - Error types (`PlacerError`)
//!
//! ## Determinism Guarantees
//!
//! All handles implement `Ord` so they can key `BTreeMap`/`BTreeSet`, and every
//! enum iterates in declaration order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// =============================================================================
// ARENA HANDLES
// =============================================================================

/// Index of a node's shared details record in the pass arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

/// Index of a resource in the pass arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub u32);

/// Index of a color (colocation group) in the pass arena.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct ColorId(pub u32);

/// Monotonic action identifier, unique within one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActionId(pub u64);

impl NodeId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl ResourceId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl ColorId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// ROLE
// =============================================================================

/// Role a resource plays on a node.
///
/// Totally ordered: `Stopped < Started < Slave < Master`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Stopped,
    Started,
    Slave,
    Master,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Started => "started",
            Self::Slave => "slave",
            Self::Master => "master",
        }
    }
}

impl FromStr for Role {
    type Err = PlacerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "stopped" => Ok(Self::Stopped),
            "started" => Ok(Self::Started),
            "slave" => Ok(Self::Slave),
            "master" => Ok(Self::Master),
            other => Err(PlacerError::Config(format!("invalid role name '{}'", other))),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// TASK
// =============================================================================

/// Closed set of action tasks.
///
/// `Running`, `Stopped`, `Promoted` and `Demoted` are the completion markers
/// of container resources; they only ever exist as pseudo actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    Start,
    Running,
    Stop,
    Stopped,
    Promote,
    Promoted,
    Demote,
    Demoted,
    Monitor,
    Cancel,
    Notify,
    #[serde(rename = "stonith")]
    Fence,
    Shutdown,
}

impl Task {
    /// Task that undoes this one.
    ///
    /// Tasks without a counterpart invert to themselves; see
    /// [`Task::is_reversible`].
    #[must_use]
    pub const fn invert(self) -> Self {
        match self {
            Self::Start => Self::Stop,
            Self::Stop => Self::Start,
            Self::Running => Self::Stopped,
            Self::Stopped => Self::Running,
            Self::Promote => Self::Demote,
            Self::Demote => Self::Promote,
            Self::Promoted => Self::Demoted,
            Self::Demoted => Self::Promoted,
            Self::Monitor | Self::Cancel | Self::Notify | Self::Fence | Self::Shutdown => self,
        }
    }

    #[must_use]
    pub const fn is_reversible(self) -> bool {
        !matches!(
            self,
            Self::Monitor | Self::Cancel | Self::Notify | Self::Fence | Self::Shutdown
        )
    }

    /// Completion marker a container uses for this task when it appears on
    /// the "first" side of an ordering.
    #[must_use]
    pub const fn completion(self) -> Self {
        match self {
            Self::Start => Self::Running,
            Self::Stop => Self::Stopped,
            Self::Promote => Self::Promoted,
            Self::Demote => Self::Demoted,
            other => other,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Running => "running",
            Self::Stop => "stop",
            Self::Stopped => "stopped",
            Self::Promote => "promote",
            Self::Promoted => "promoted",
            Self::Demote => "demote",
            Self::Demoted => "demoted",
            Self::Monitor => "monitor",
            Self::Cancel => "cancel",
            Self::Notify => "notify",
            Self::Fence => "stonith",
            Self::Shutdown => "shutdown",
        }
    }
}

impl FromStr for Task {
    type Err = PlacerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let task = match s {
            "start" => Self::Start,
            "running" => Self::Running,
            "stop" => Self::Stop,
            "stopped" => Self::Stopped,
            "promote" => Self::Promote,
            "promoted" => Self::Promoted,
            "demote" => Self::Demote,
            "demoted" => Self::Demoted,
            "monitor" => Self::Monitor,
            "cancel" => Self::Cancel,
            "notify" => Self::Notify,
            "stonith" | "fence" => Self::Fence,
            "shutdown" => Self::Shutdown,
            other => return Err(PlacerError::Config(format!("unknown task '{}'", other))),
        };
        Ok(task)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// POLICIES
// =============================================================================

/// What to do when a resource is found active on more than one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RecoveryPolicy {
    #[default]
    StopStart,
    StopOnly,
    Block,
}

/// Default reaction to a failed stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StopFailurePolicy {
    Block,
    Fence,
    Ignore,
}

/// Whether a resource restarts when something it is ordered after restarts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    #[default]
    Ignore,
    Restart,
}

/// Reaction to a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OnFail {
    Ignore,
    Block,
    Stop,
    Restart,
    Fence,
    Migrate,
}

/// Precondition an action needs before it may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Needs {
    Nothing,
    Quorum,
    Fencing,
}

/// Behaviour of a partition that has lost quorum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum NoQuorumPolicy {
    Freeze,
    #[default]
    Stop,
    Ignore,
}

/// Strength of a colocation constraint.
///
/// Declaration order is the processing order of a resource's constraint list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColocationStrength {
    MustNot,
    Must,
    Ignore,
}

/// Type of an ordering constraint.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "kebab-case")]
pub enum OrderKind {
    Mandatory,
    #[default]
    Optional,
    Recover,
}

impl OrderKind {
    /// A mandatory "before" action makes the "after" action mandatory.
    #[must_use]
    pub const fn propagates_mandatory(self) -> bool {
        matches!(self, Self::Mandatory | Self::Recover)
    }

    /// A mandatory but unrunnable "before" action blocks the "after" action.
    #[must_use]
    pub const fn propagates_unrunnable(self) -> bool {
        matches!(self, Self::Mandatory)
    }
}

/// Recorded outcome of an operation in the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OpStatus {
    Pending,
    Done,
    Error,
    Timeout,
    NotSupported,
    Cancelled,
}

impl OpStatus {
    #[must_use]
    pub const fn is_failure(self) -> bool {
        matches!(self, Self::Error | Self::Timeout | Self::NotSupported)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that abort a scheduling pass or fail an input loader.
///
/// Recoverable conditions never surface here; they are recorded in
/// [`crate::Diagnostics`] and the pass continues.
#[derive(Debug, Error)]
pub enum PlacerError {
    /// Two resources sharing a color were assigned different nodes.
    #[error("Color {color:?} assigned both {first:?} and {second:?}")]
    ColorConflict {
        color: ColorId,
        first: Option<NodeId>,
        second: Option<NodeId>,
    },

    /// A completed operation carries an unusable call id.
    #[error("Invalid call id {call_id} for {resource} on {node}")]
    InvalidCallId {
        resource: String,
        node: String,
        call_id: i64,
    },

    /// The emitted action graph contains a cycle.
    #[error("Ordering cycle through action {0}")]
    OrderingCycle(ActionId),

    /// An action handle does not resolve.
    #[error("Action not found: {0}")]
    UnknownAction(ActionId),

    /// A resource handle does not resolve.
    #[error("Resource not found: {0}")]
    UnknownResource(String),

    /// `+INFINITY` was merged with `-INFINITY`.
    #[error("Score conflict: +INFINITY merged with -INFINITY")]
    ScoreConflict,

    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
