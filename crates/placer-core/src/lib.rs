//! # placer-core
//!
//! The deterministic placement scheduler for Placer - THE ENGINE.
//!
//! Given an already-parsed cluster snapshot (nodes, resources, constraints,
//! node status and operation history), one pass computes where every
//! resource should run and the ordered actions that move the cluster there.
//!
//! ## Pipeline
//!
//! 1. `model` - snapshot to arenas of nodes, resources and constraints
//! 2. `synth::history` - operation replay and failure policy
//! 3. `placement` - location rules to weighted candidate lists
//! 4. `allocate` - colocation-aware node choice (coloring)
//! 5. `synth` - start/stop/promote/demote/monitor actions
//! 6. `order` - before/after graph, fencing, state propagation
//! 7. `emit` - synapses for the transition executor
//!
//! ## Architectural Constraints
//!
//! - Single-threaded and synchronous; NO async, NO network dependencies
//! - `BTreeMap`/`BTreeSet` only, no floating point, no randomness
//! - Nothing survives between passes; the snapshot is the only input
//! - Recoverable problems are diagnostics, invariant violations abort

// =============================================================================
// MODULES
// =============================================================================

pub mod allocate;
pub mod config;
pub mod context;
pub mod emit;
pub mod export;
pub mod input;
pub mod model;
pub mod order;
pub mod pass;
pub mod placement;
pub mod primitives;
pub mod score;
pub mod synth;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use config::ClusterOptions;
pub use context::{Diagnostics, SchedulingContext};
pub use score::Score;
pub use types::{
    ActionId, ColorId, NodeId, OrderKind, PlacerError, ResourceId, Role, Task,
};

// =============================================================================
// RE-EXPORTS: Input & Model
// =============================================================================

pub use input::ClusterSnapshot;
pub use model::{ClusterModel, ModelBuilder, NodeList};

// =============================================================================
// RE-EXPORTS: Scheduling Phases
// =============================================================================

pub use allocate::ColoringAllocator;
pub use emit::{GraphAction, GraphEmitter, Synapse, TransitionGraph};
pub use order::OrderingBuilder;
pub use pass::{PassOutput, prepare, schedule, schedule_with};
pub use placement::PlacementEngine;
pub use synth::{ActionSynthesizer, HistoryReplayer};

// =============================================================================
// RE-EXPORTS: Canonical Export
// =============================================================================

pub use export::{
    CanonicalHeader, canonical_checksum, export_canonical, import_canonical, verify_canonical,
};

#[cfg(feature = "crypto-hash")]
pub use export::canonical_crypto_hash;
