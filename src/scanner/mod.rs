//! The enumeration loop
//!
//! This module handles:
//! - Pacing request starts with a swappable clock
//! - Driving candidates through resolution and persistence
//! - Run counters, summaries and the resume hint shown on interrupt
//! - Single-URL test mode

mod driver;
mod rate_limiter;

pub use driver::{test_url, ScanProgress, ScanSummary, Scanner, StepReport};
pub use rate_limiter::{Clock, RateLimiter, TokioClock};
