//! Configuration module for Shortcode-Sweep
//!
//! This module handles loading, parsing, and validating the TOML session
//! configuration. Every key has a default, so a session can also be built
//! without any file and adjusted from the command line.
//!
//! # Example
//!
//! ```no_run
//! use shortcode_sweep::config::load_config;
//! use std::path::Path;
//!
//! let session = load_config(Path::new("sweep.toml")).unwrap();
//! println!("Scanning suffixes of length {}", session.scan.length);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    suffix_of, DetectionConfig, HttpConfig, ScanConfig, ScanSession, DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
