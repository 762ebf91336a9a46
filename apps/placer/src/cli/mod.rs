//! # Placer CLI Module
//!
//! This module implements the CLI interface for Placer.
//!
//! ## Available Commands
//!
//! - `schedule` - Run a pass and write the transition graph
//! - `placement` - Show where every resource goes
//! - `check` - Show diagnostics only
//! - `digest` - Compute the canonical checksum and BLAKE3 digest of the graph
//! - `inspect` - Verify a canonical export and list triggerable synapses

mod commands;

use clap::{Parser, Subcommand};
use placer_core::PlacerError;
use std::path::PathBuf;
use std::process::ExitCode;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Placer - cluster placement scheduler
///
/// Reads a cluster snapshot, decides where every resource runs and emits the
/// ordered actions that get it there.
#[derive(Parser, Debug)]
#[command(name = "placer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a scheduling pass and write the transition graph
    Schedule {
        /// Cluster snapshot (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Cluster options (TOML), replacing the snapshot's own
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file path (printed to stdout when absent)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (json, canonical)
        #[arg(short = 't', long, default_value = "json")]
        format: String,
    },

    /// Show the resource to node assignment
    Placement {
        /// Cluster snapshot (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Cluster options (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Run a pass and report diagnostics only
    Check {
        /// Cluster snapshot (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Cluster options (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Compute the canonical checksum and BLAKE3 digest of the graph
    Digest {
        /// Cluster snapshot (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Cluster options (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Verify a canonical graph export and list triggerable synapses
    Inspect {
        /// Canonical graph file
        #[arg(short, long)]
        graph: PathBuf,

        /// Confirmed action ids (comma-separated)
        #[arg(long)]
        completed: Option<String>,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<ExitCode, PlacerError> {
    let json_mode = cli.json;

    match cli.command {
        Commands::Schedule {
            input,
            config,
            output,
            format,
        } => cmd_schedule(&input, config.as_deref(), output.as_deref(), &format, json_mode)
            .map(|_| ExitCode::SUCCESS),
        Commands::Placement { input, config } => {
            cmd_placement(&input, config.as_deref(), json_mode).map(|_| ExitCode::SUCCESS)
        }
        Commands::Check { input, config } => {
            let diagnostics = cmd_check(&input, config.as_deref(), json_mode)?;
            Ok(if diagnostics.processing_errors.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Commands::Digest { input, config } => {
            cmd_digest(&input, config.as_deref(), json_mode).map(|_| ExitCode::SUCCESS)
        }
        Commands::Inspect { graph, completed } => {
            let completed = parse_action_ids(completed.as_deref())?;
            cmd_inspect(&graph, &completed, json_mode).map(|_| ExitCode::SUCCESS)
        }
    }
}
