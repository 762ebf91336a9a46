//! # Canonical Export Module
//!
//! Bit-exact `postcard` encoding of a [`TransitionGraph`].
//!
//! Two passes over the same snapshot must produce byte-identical exports;
//! this is what the determinism checks compare.
//!
//! Format:
//! ```text
//! [header_len: u32 LE] [CanonicalHeader (postcard)] [TransitionGraph (postcard)]
//! ```

use crate::emit::{GraphAction, TransitionGraph};
use crate::types::PlacerError;
use serde::{Deserialize, Serialize};

// =============================================================================
// CANONICAL FORMAT
// =============================================================================

/// Magic bytes for canonical export format.
pub const CANONICAL_MAGIC: [u8; 4] = *b"PLTG"; // Placer Transition Graph

/// Current canonical format version.
pub const CANONICAL_VERSION: u8 = 1;

/// Upper bound on synapses accepted by [`import_canonical`].
pub const MAX_IMPORT_SYNAPSE_COUNT: u64 = 1_000_000;

/// Header for canonical export files.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalHeader {
    pub magic: [u8; 4],
    pub version: u8,
    pub synapse_count: u64,
    pub action_count: u64,
    /// [`graph_checksum`] of the data section.
    pub checksum: u64,
}

impl CanonicalHeader {
    #[must_use]
    pub fn new(synapse_count: u64, action_count: u64, checksum: u64) -> Self {
        Self {
            magic: CANONICAL_MAGIC,
            version: CANONICAL_VERSION,
            synapse_count,
            action_count,
            checksum,
        }
    }

    /// Validate the header.
    pub fn validate(&self) -> Result<(), PlacerError> {
        if self.magic != CANONICAL_MAGIC {
            return Err(PlacerError::SerializationError(
                "Invalid file format".to_string(),
            ));
        }
        if self.version != CANONICAL_VERSION {
            return Err(PlacerError::SerializationError(
                "Unsupported file version".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// CHECKSUM
// =============================================================================

/// Order-sensitive rotate/XOR accumulator.
///
/// Not a cryptographic hash; use [`canonical_crypto_hash`] (feature
/// `crypto-hash`) where tampering matters.
#[derive(Debug, Default)]
struct Checksum(u64);

impl Checksum {
    fn word(&mut self, value: u64) {
        self.0 = self.0.rotate_left(7) ^ value;
    }

    fn flag(&mut self, value: bool) {
        self.word(u64::from(value));
    }

    fn text(&mut self, value: &str) {
        self.word(value.len() as u64);
        for byte in value.as_bytes() {
            self.0 = self.0.rotate_left(5) ^ u64::from(*byte);
        }
    }

    fn opt_text(&mut self, value: Option<&str>) {
        match value {
            Some(s) => {
                self.flag(true);
                self.text(s);
            }
            None => self.flag(false),
        }
    }

    fn action(&mut self, action: &GraphAction) {
        self.word(action.id.0);
        self.text(&action.key);
        self.text(action.task.as_str());
        self.opt_text(action.resource.as_deref());
        self.opt_text(action.node.as_deref());
        self.word(action.interval_ms);
        self.word(action.timeout_ms);
        self.flag(action.pseudo);
        self.flag(action.optional);
        self.flag(action.runnable);
        for (k, v) in action.params.iter().chain(&action.meta) {
            self.text(k);
            self.text(v);
        }
    }
}

/// Deterministic checksum of a transition graph.
#[must_use]
pub fn graph_checksum(graph: &TransitionGraph) -> u64 {
    let mut sum = Checksum::default();
    sum.word(graph.transition_timeout_ms);
    for synapse in &graph.synapses {
        sum.word(u64::from(synapse.id));
        for action in &synapse.actions {
            sum.action(action);
        }
        for input in &synapse.inputs {
            sum.word(input.0);
        }
    }
    for action in &graph.unrunnable {
        sum.action(action);
    }
    sum.0
}

// =============================================================================
// EXPORT FUNCTIONS
// =============================================================================

/// Export a transition graph to canonical postcard format.
pub fn export_canonical(graph: &TransitionGraph) -> Result<Vec<u8>, PlacerError> {
    let header = CanonicalHeader::new(
        graph.synapses.len() as u64,
        graph.action_count() as u64,
        graph_checksum(graph),
    );

    let header_bytes = postcard::to_allocvec(&header)
        .map_err(|e| PlacerError::SerializationError(format!("Header: {}", e)))?;
    let data_bytes = postcard::to_allocvec(graph)
        .map_err(|e| PlacerError::SerializationError(format!("Data: {}", e)))?;

    let mut result = Vec::with_capacity(4 + header_bytes.len() + data_bytes.len());
    result.extend_from_slice(&(header_bytes.len() as u32).to_le_bytes());
    result.extend_from_slice(&header_bytes);
    result.extend_from_slice(&data_bytes);
    Ok(result)
}

/// Import a transition graph from canonical postcard format.
pub fn import_canonical(data: &[u8]) -> Result<TransitionGraph, PlacerError> {
    let Some((len_bytes, rest)) = data.split_first_chunk::<4>() else {
        return Err(PlacerError::SerializationError(
            "Data too short".to_string(),
        ));
    };
    let header_len = u32::from_le_bytes(*len_bytes) as usize;
    if rest.len() < header_len {
        return Err(PlacerError::SerializationError(
            "Data too short for header".to_string(),
        ));
    }
    let (header_bytes, data_bytes) = rest.split_at(header_len);

    let header: CanonicalHeader = postcard::from_bytes(header_bytes)
        .map_err(|e| PlacerError::SerializationError(format!("Header: {}", e)))?;
    header.validate()?;
    if header.synapse_count > MAX_IMPORT_SYNAPSE_COUNT {
        return Err(PlacerError::SerializationError(format!(
            "Synapse count {} exceeds maximum allowed {}",
            header.synapse_count, MAX_IMPORT_SYNAPSE_COUNT
        )));
    }

    let graph: TransitionGraph = postcard::from_bytes(data_bytes)
        .map_err(|e| PlacerError::SerializationError(format!("Data: {}", e)))?;

    let computed = graph_checksum(&graph);
    if computed != header.checksum {
        return Err(PlacerError::SerializationError(format!(
            "Checksum mismatch: expected {}, got {}",
            header.checksum, computed
        )));
    }
    if graph.synapses.len() as u64 != header.synapse_count
        || graph.action_count() as u64 != header.action_count
    {
        return Err(PlacerError::SerializationError(
            "Count mismatch".to_string(),
        ));
    }
    Ok(graph)
}

/// Whether `canonical_data` decodes to exactly `graph`.
pub fn verify_canonical(graph: &TransitionGraph, canonical_data: &[u8]) -> Result<bool, PlacerError> {
    Ok(import_canonical(canonical_data)? == *graph)
}

/// Checksum of the canonical form; equal graphs have equal checksums.
#[must_use]
pub fn canonical_checksum(graph: &TransitionGraph) -> u64 {
    graph_checksum(graph)
}

// =============================================================================
// CRYPTOGRAPHIC DIGEST
// =============================================================================

/// BLAKE3 digest of the canonical export, as 64 hex characters.
#[cfg(feature = "crypto-hash")]
#[must_use]
pub fn canonical_crypto_hash(graph: &TransitionGraph) -> String {
    let data = export_canonical(graph).unwrap_or_default();
    compute_blake3_hash(&data)
}

#[cfg(feature = "crypto-hash")]
pub fn verify_crypto_hash(graph: &TransitionGraph, expected_hash: &str) -> bool {
    canonical_crypto_hash(graph) == expected_hash
}

/// BLAKE3 digest of raw bytes.
#[cfg(feature = "crypto-hash")]
#[must_use]
pub fn compute_blake3_hash(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

// =============================================================================
// TESTS
// =============================================================================
