/// Classifier state definitions
///
/// This module defines every state a candidate passes through while it is
/// being resolved, and which transitions between them are legal.
use crate::state::ResolutionOutcome;
use std::fmt;

/// Represents where the classifier is in resolving one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionState {
    // ===== Active States =====
    /// Candidate selected, no request issued yet
    Pending,

    /// The single request for the short URL is in flight
    Requesting,

    /// The response is the warning interstitial
    WarningDetected,

    /// Searching the interstitial body for the destination
    Extracting,

    // ===== Terminal States =====
    /// Redirect straight to the destination
    DirectRedirect,

    /// Destination recovered from the interstitial
    ResolvedFromWarning,

    /// Interstitial contained no usable destination
    ExtractionFailed,

    /// 404 or a not-found page
    NotFound,

    /// Status code with no specific rule
    HttpError,

    /// Transport timeout
    TimedOut,

    /// Any other transport failure
    ConnectionFailed,
}

impl ResolutionState {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        !matches!(
            self,
            Self::Pending | Self::Requesting | Self::WarningDetected | Self::Extracting
        )
    }

    /// Returns true if `next` is a legal successor of this state
    pub fn can_transition_to(&self, next: ResolutionState) -> bool {
        use ResolutionState::*;

        match self {
            Pending => next == Requesting,
            Requesting => matches!(
                next,
                DirectRedirect | WarningDetected | NotFound | HttpError | TimedOut | ConnectionFailed
            ),
            WarningDetected => next == Extracting,
            Extracting => matches!(next, ResolvedFromWarning | ExtractionFailed),
            _ => false,
        }
    }

    /// Returns true if a terminal state can carry `outcome`
    ///
    /// `ExtractionFailed` is recorded as `link_not_found`.
    pub fn produces(&self, outcome: &ResolutionOutcome) -> bool {
        matches!(
            (self, outcome),
            (Self::DirectRedirect, ResolutionOutcome::DirectRedirect { .. })
                | (
                    Self::ResolvedFromWarning,
                    ResolutionOutcome::ResolvedFromWarning { .. }
                )
                | (Self::ExtractionFailed, ResolutionOutcome::LinkNotFound)
                | (Self::NotFound, ResolutionOutcome::LinkNotFound)
                | (Self::HttpError, ResolutionOutcome::HttpError { .. })
                | (Self::TimedOut, ResolutionOutcome::RequestTimeout)
                | (Self::ConnectionFailed, ResolutionOutcome::ConnectionFailed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Requesting => "requesting",
            Self::WarningDetected => "warning_detected",
            Self::Extracting => "extracting",
            Self::DirectRedirect => "direct_redirect",
            Self::ResolvedFromWarning => "resolved_from_warning",
            Self::ExtractionFailed => "extraction_failed",
            Self::NotFound => "not_found",
            Self::HttpError => "http_error",
            Self::TimedOut => "timed_out",
            Self::ConnectionFailed => "connection_failed",
        }
    }

    /// Returns all states
    pub fn all_states() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Requesting,
            Self::WarningDetected,
            Self::Extracting,
            Self::DirectRedirect,
            Self::ResolvedFromWarning,
            Self::ExtractionFailed,
            Self::NotFound,
            Self::HttpError,
            Self::TimedOut,
            Self::ConnectionFailed,
        ]
    }
}

impl fmt::Display for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_terminal() {
        assert!(!ResolutionState::Pending.is_terminal());
        assert!(!ResolutionState::Requesting.is_terminal());
        assert!(!ResolutionState::WarningDetected.is_terminal());
        assert!(!ResolutionState::Extracting.is_terminal());

        assert!(ResolutionState::DirectRedirect.is_terminal());
        assert!(ResolutionState::ResolvedFromWarning.is_terminal());
        assert!(ResolutionState::ExtractionFailed.is_terminal());
        assert!(ResolutionState::NotFound.is_terminal());
        assert!(ResolutionState::HttpError.is_terminal());
        assert!(ResolutionState::TimedOut.is_terminal());
        assert!(ResolutionState::ConnectionFailed.is_terminal());
    }

    #[test]
    fn test_terminal_states_have_no_successors() {
        for state in ResolutionState::all_states() {
            if state.is_terminal() {
                for next in ResolutionState::all_states() {
                    assert!(!state.can_transition_to(next), "{} -> {}", state, next);
                }
            }
        }
    }

    #[test]
    fn test_warning_path() {
        use ResolutionState::*;
        assert!(Pending.can_transition_to(Requesting));
        assert!(Requesting.can_transition_to(WarningDetected));
        assert!(WarningDetected.can_transition_to(Extracting));
        assert!(Extracting.can_transition_to(ResolvedFromWarning));
        assert!(Extracting.can_transition_to(ExtractionFailed));

        assert!(!Pending.can_transition_to(DirectRedirect));
        assert!(!Requesting.can_transition_to(ResolvedFromWarning));
        assert!(!WarningDetected.can_transition_to(NotFound));
    }

    #[test]
    fn test_extraction_failure_records_not_found() {
        assert!(ResolutionState::ExtractionFailed.produces(&ResolutionOutcome::LinkNotFound));
        assert!(!ResolutionState::ExtractionFailed.produces(&ResolutionOutcome::ConnectionFailed));
        assert!(ResolutionState::TimedOut.produces(&ResolutionOutcome::RequestTimeout));
    }

    #[test]
    fn test_all_states_complete() {
        let all = ResolutionState::all_states();
        assert_eq!(all.len(), 11);

        for i in 0..all.len() {
            for j in (i + 1)..all.len() {
                assert_ne!(all[i], all[j], "Duplicate state found");
            }
        }
    }
}
