//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands. Each
//! command prints its result and also returns it, so the commands can be
//! driven directly from tests.

use placer_core::export::{canonical_crypto_hash, compute_blake3_hash};
use placer_core::{
    ActionId, ClusterOptions, ClusterSnapshot, Diagnostics, PassOutput, PlacerError,
    canonical_checksum, export_canonical, import_canonical, schedule_with, verify_canonical,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum snapshot size (100 MB).
const MAX_SNAPSHOT_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Maximum canonical graph size (500 MB).
const MAX_GRAPH_FILE_SIZE: u64 = 500 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), PlacerError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| PlacerError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(PlacerError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Resolve an input path to an existing regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, PlacerError> {
    let canonical = path.canonicalize().map_err(|e| {
        PlacerError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(PlacerError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Resolve an output path whose parent directory must exist.
fn validate_output_path(path: &Path) -> Result<PathBuf, PlacerError> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        PlacerError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(PlacerError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| PlacerError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// LOADING
// =============================================================================

/// Read and parse a JSON cluster snapshot.
pub fn load_snapshot(path: &Path) -> Result<ClusterSnapshot, PlacerError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, MAX_SNAPSHOT_FILE_SIZE)?;

    let data = std::fs::read(&validated)
        .map_err(|e| PlacerError::IoError(format!("Read file: {}", e)))?;
    let snapshot: ClusterSnapshot = serde_json::from_slice(&data)
        .map_err(|e| PlacerError::SerializationError(format!("Snapshot: {}", e)))?;

    debug!(
        path = %validated.display(),
        nodes = snapshot.nodes.len(),
        resources = snapshot.resources.len(),
        "snapshot loaded"
    );
    Ok(snapshot)
}

/// The options for a pass: the TOML file when given, else the snapshot's.
pub fn load_options(
    snapshot: &ClusterSnapshot,
    config: Option<&Path>,
) -> Result<ClusterOptions, PlacerError> {
    match config {
        Some(path) => {
            let validated = validate_file_path(path)?;
            info!(path = %validated.display(), "loading cluster options");
            ClusterOptions::from_toml_file(validated)
        }
        None => Ok(snapshot.options.clone()),
    }
}

/// Load a snapshot and run one scheduling pass over it.
pub fn run_pass(input: &Path, config: Option<&Path>) -> Result<PassOutput, PlacerError> {
    let snapshot = load_snapshot(input)?;
    let options = load_options(&snapshot, config)?;
    schedule_with(&snapshot, options)
}

/// Parse a comma-separated list of action ids.
pub fn parse_action_ids(list: Option<&str>) -> Result<BTreeSet<ActionId>, PlacerError> {
    let Some(list) = list else {
        return Ok(BTreeSet::new());
    };
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>()
                .map(ActionId)
                .map_err(|_| PlacerError::Config(format!("invalid action id '{}'", s)))
        })
        .collect()
}

fn print_json<T: Serialize>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

// =============================================================================
// SCHEDULE COMMAND
// =============================================================================

/// Run a pass and write the transition graph.
///
/// `json` writes the whole pass output, `canonical` the postcard export of
/// the graph alone.
pub fn cmd_schedule(
    input: &Path,
    config: Option<&Path>,
    output: Option<&Path>,
    format: &str,
    json_mode: bool,
) -> Result<PassOutput, PlacerError> {
    let out = run_pass(input, config)?;

    let data = match format {
        "json" => serde_json::to_vec_pretty(&out)
            .map_err(|e| PlacerError::SerializationError(e.to_string()))?,
        "canonical" => {
            if output.is_none() {
                return Err(PlacerError::Config(
                    "canonical format needs an output file".to_string(),
                ));
            }
            export_canonical(&out.graph)?
        }
        _ => {
            return Err(PlacerError::Config(format!(
                "Unknown format: {}. Use: json, canonical",
                format
            )));
        }
    };

    match output {
        Some(path) => {
            let validated = validate_output_path(path)?;
            std::fs::write(&validated, &data)
                .map_err(|e| PlacerError::IoError(format!("Write file: {}", e)))?;
            if json_mode {
                print_json(&serde_json::json!({
                    "output": validated.to_string_lossy(),
                    "bytes": data.len(),
                    "synapses": out.graph.synapses.len(),
                    "unrunnable": out.graph.unrunnable.len(),
                    "checksum": canonical_checksum(&out.graph)
                }));
            } else {
                println!("Wrote {} bytes to {:?}", data.len(), validated);
                println!("Synapses:   {}", out.graph.synapses.len());
                println!("Unrunnable: {}", out.graph.unrunnable.len());
            }
        }
        None => println!("{}", String::from_utf8_lossy(&data)),
    }

    Ok(out)
}

// =============================================================================
// PLACEMENT COMMAND
// =============================================================================

/// One resource's outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacementRow {
    pub node: Option<String>,
    pub role: String,
}

/// Show where every resource goes.
pub fn cmd_placement(
    input: &Path,
    config: Option<&Path>,
    json_mode: bool,
) -> Result<BTreeMap<String, PlacementRow>, PlacerError> {
    let out = run_pass(input, config)?;
    let rows: BTreeMap<String, PlacementRow> = out
        .placement
        .iter()
        .map(|(rsc, node)| {
            let role = out
                .roles
                .get(rsc)
                .map_or_else(|| "Stopped".to_string(), ToString::to_string);
            (
                rsc.clone(),
                PlacementRow {
                    node: node.clone(),
                    role,
                },
            )
        })
        .collect();

    if json_mode {
        print_json(&rows);
        return Ok(rows);
    }

    println!("Placer Placement");
    println!("================");
    for (rsc, row) in &rows {
        println!(
            "{:<24} {:<16} {}",
            rsc,
            row.node.as_deref().unwrap_or("-"),
            row.role
        );
    }

    Ok(rows)
}

// =============================================================================
// CHECK COMMAND
// =============================================================================

/// Run a pass and report diagnostics only.
pub fn cmd_check(
    input: &Path,
    config: Option<&Path>,
    json_mode: bool,
) -> Result<Diagnostics, PlacerError> {
    let diagnostics = run_pass(input, config)?.diagnostics;

    if !diagnostics.processing_errors.is_empty() {
        warn!(
            errors = diagnostics.processing_errors.len(),
            "snapshot has processing errors"
        );
    }

    if json_mode {
        print_json(&diagnostics);
        return Ok(diagnostics);
    }

    if diagnostics.is_clean() {
        println!("No problems found.");
        return Ok(diagnostics);
    }
    for (title, lines) in [
        ("Configuration errors", &diagnostics.config_errors),
        ("Configuration warnings", &diagnostics.config_warnings),
        ("Processing errors", &diagnostics.processing_errors),
        ("Processing warnings", &diagnostics.processing_warnings),
    ] {
        if lines.is_empty() {
            continue;
        }
        println!("{} ({}):", title, lines.len());
        for line in lines {
            println!("  - {}", line);
        }
    }

    Ok(diagnostics)
}

// =============================================================================
// DIGEST COMMAND
// =============================================================================

/// Checksums of a pass's transition graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphDigest {
    pub checksum: u64,
    pub blake3: String,
    pub synapses: usize,
    pub actions: usize,
}

/// Compute the canonical checksum and BLAKE3 digest of the graph.
pub fn cmd_digest(
    input: &Path,
    config: Option<&Path>,
    json_mode: bool,
) -> Result<GraphDigest, PlacerError> {
    let out = run_pass(input, config)?;
    let digest = GraphDigest {
        checksum: canonical_checksum(&out.graph),
        blake3: canonical_crypto_hash(&out.graph),
        synapses: out.graph.synapses.len(),
        actions: out.graph.action_count(),
    };

    if json_mode {
        print_json(&digest);
    } else {
        println!("Checksum: {}", digest.checksum);
        println!("BLAKE3:   {}", digest.blake3);
        println!("Synapses: {}", digest.synapses);
        println!("Actions:  {}", digest.actions);
    }

    Ok(digest)
}

// =============================================================================
// INSPECT COMMAND
// =============================================================================

/// Import a canonical graph, verify it, and list the synapses that can
/// fire once `completed` actions are confirmed. Returns their ids.
pub fn cmd_inspect(
    graph_path: &Path,
    completed: &BTreeSet<ActionId>,
    json_mode: bool,
) -> Result<Vec<u32>, PlacerError> {
    let validated = validate_file_path(graph_path)?;
    validate_file_size(&validated, MAX_GRAPH_FILE_SIZE)?;

    let data = std::fs::read(&validated)
        .map_err(|e| PlacerError::IoError(format!("Read file: {}", e)))?;
    let graph = import_canonical(&data)?;
    if !verify_canonical(&graph, &data)? {
        return Err(PlacerError::SerializationError(
            "Canonical graph does not re-export identically".to_string(),
        ));
    }

    let ready = graph.ready_synapses(completed);
    let ids: Vec<u32> = ready.iter().map(|s| s.id).collect();

    if json_mode {
        let synapses: Vec<_> = ready
            .iter()
            .map(|s| {
                serde_json::json!({
                    "id": s.id,
                    "actions": s.actions.iter().map(|a| &a.key).collect::<Vec<_>>(),
                    "inputs": s.inputs
                })
            })
            .collect();
        print_json(&serde_json::json!({
            "synapses": graph.synapses.len(),
            "blake3": compute_blake3_hash(&data),
            "ready": synapses
        }));
        return Ok(ids);
    }

    println!("Synapses: {}", graph.synapses.len());
    println!("BLAKE3:   {}", compute_blake3_hash(&data));
    println!("Ready ({}):", ready.len());
    for synapse in ready {
        for action in &synapse.actions {
            println!(
                "  [{}] {} on {}",
                synapse.id,
                action.key,
                action.node.as_deref().unwrap_or("-")
            );
        }
    }

    Ok(ids)
}
