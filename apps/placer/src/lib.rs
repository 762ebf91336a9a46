//! # Placer
//!
//! Command-line front end for `placer-core`: loads a cluster snapshot and
//! optional TOML options, runs one scheduling pass and reports the result.

pub mod cli;
