//! Resolution state for individual candidates
//!
//! # Components
//!
//! - `ResolutionOutcome`: the closed set of results recorded per candidate
//! - `ResolutionState`: the classifier's state machine, from `Pending` to a
//!   terminal state

mod outcome;
mod resolution_state;

// Re-export main types
pub use outcome::ResolutionOutcome;
pub use resolution_state::ResolutionState;
