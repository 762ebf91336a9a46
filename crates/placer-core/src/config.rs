//! # Cluster Options
//!
//! Cluster-wide switches consulted by every phase of a pass. They are supplied
//! with the snapshot or loaded from a TOML file:
//!
//! ```
//! use placer_core::ClusterOptions;
//! use placer_core::types::NoQuorumPolicy;
//!
//! let opts = ClusterOptions::from_toml_str(r#"
//!     have_quorum = false
//!     no_quorum_policy = "freeze"
//!     stonith_enabled = true
//! "#).expect("options");
//!
//! assert_eq!(opts.no_quorum_policy, NoQuorumPolicy::Freeze);
//! assert!(opts.symmetric_cluster);
//! ```

use crate::primitives::DEFAULT_TRANSITION_TIMEOUT_MS;
use crate::score::Score;
use crate::types::{NoQuorumPolicy, PlacerError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Cluster-wide scheduling options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterOptions {
    /// The partition holds quorum.
    pub have_quorum: bool,
    /// Fencing is available. Nodes never seen in status are unclean.
    pub stonith_enabled: bool,
    pub no_quorum_policy: NoQuorumPolicy,
    /// Resources may run anywhere unless a constraint excludes them.
    pub symmetric_cluster: bool,
    /// Orphaned resources are pinned to `-INFINITY` everywhere.
    pub stop_orphan_resources: bool,
    /// Recurring operations with no definition get a `cancel` action.
    pub stop_orphan_actions: bool,
    pub is_managed_default: bool,
    /// Added to the weight of the node a resource already runs on.
    pub default_resource_stickiness: Score,
    /// Id of the designated coordinator node.
    pub dc_node: Option<String>,
    pub transition_timeout_ms: u64,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            have_quorum: true,
            stonith_enabled: false,
            no_quorum_policy: NoQuorumPolicy::Stop,
            symmetric_cluster: true,
            stop_orphan_resources: true,
            stop_orphan_actions: true,
            is_managed_default: true,
            default_resource_stickiness: Score::ZERO,
            dc_node: None,
            transition_timeout_ms: DEFAULT_TRANSITION_TIMEOUT_MS,
        }
    }
}

impl ClusterOptions {
    /// Parse options from a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, PlacerError> {
        toml::from_str(s).map_err(|e| PlacerError::Config(e.to_string()))
    }

    /// Load options from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, PlacerError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PlacerError::IoError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&contents)
    }

    /// Quorum is either held or ignored by policy.
    #[must_use]
    pub fn quorum_satisfied(&self) -> bool {
        self.have_quorum || self.no_quorum_policy == NoQuorumPolicy::Ignore
    }
}

// =============================================================================
// TESTS
// =============================================================================
