//! Shortcode-Sweep: a resumable short-link enumerator
//!
//! This crate walks every fixed-length suffix of a URL shortener in strict
//! lexicographic order, resolves each one to its outcome (redirect, warning
//! interstitial, not found, network failure) and appends one durable CSV
//! record per candidate so that an interrupted multi-day scan picks up
//! exactly where it stopped.

pub mod candidate;
pub mod config;
pub mod output;
pub mod resolver;
pub mod scanner;
pub mod state;
pub mod storage;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Shortcode-Sweep operations
///
/// Per-candidate network outcomes are never errors; they are recorded as
/// [`state::ResolutionOutcome`] values and the scan moves on.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid candidate '{candidate}': {reason}")]
    InvalidCandidate { candidate: String, reason: String },

    #[error("Cannot resume from {}: {reason}", path.display())]
    CorruptResumeState { path: PathBuf, reason: String },

    #[error("Persistence failure: {0}")]
    Store(#[from] StoreError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Invalid detection pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),
}

/// Output store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error on {}: {source}", path.display())]
    Csv { path: PathBuf, source: csv::Error },
}

/// Result type alias for Shortcode-Sweep operations
pub type Result<T> = std::result::Result<T, ScanError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for output store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// Re-export commonly used types
pub use candidate::{Candidate, CandidateSequence, ALPHABET};
pub use config::ScanSession;
pub use scanner::{ScanSummary, Scanner};
pub use state::{ResolutionOutcome, ResolutionState};
pub use storage::ScanRecord;
