//! Output module for reporting on scan results
//!
//! This module handles:
//! - Aggregating an existing output store into per-status counts
//! - Printing those statistics for the `--stats` command

pub mod stats;

pub use stats::{format_statistics, load_statistics, print_statistics, ScanStatistics};
