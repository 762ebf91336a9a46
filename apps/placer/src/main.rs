//! # Placer - Cluster Placement Scheduler
//!
//! The command-line binary for the deterministic placement engine.
//!
//! ## Usage
//!
//! ```bash
//! # Write the transition graph for a snapshot
//! placer schedule -i cluster.json -o graph.json
//!
//! # Where does everything go?
//! placer placement -i cluster.json -c options.toml
//!
//! # Diagnostics only, non-zero exit on processing errors
//! placer check -i cluster.json
//! ```

use clap::Parser;
use placer::cli;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() -> ExitCode {
    let cli = cli::Cli::parse();

    // PLACER_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("PLACER_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let default_filter = if cli.verbose {
        "placer=debug,placer_core=debug"
    } else {
        "placer=info,placer_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if !cli.quiet && !cli.json {
        eprintln!("placer v{}", env!("CARGO_PKG_VERSION"));
    }

    match cli::execute(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
