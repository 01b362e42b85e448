/// Outcome definitions for resolved candidates
///
/// Internally outcomes are a closed enum; the fixed status literals only
/// appear at the persistence boundary through `status_tag`/`from_fields`.
use std::fmt;

/// Prefix used in the destination column for `http_error` records
const HTTP_ERROR_PREFIX: &str = "HTTP_";

/// The result of resolving one candidate
///
/// Exactly one outcome is produced per attempt and it is never modified
/// after being recorded.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResolutionOutcome {
    /// The service answered with a redirect straight to the destination
    DirectRedirect { destination: String },

    /// The destination was recovered from the warning interstitial
    ResolvedFromWarning { destination: String },

    /// The code does not exist, or its interstitial had no usable target
    LinkNotFound,

    /// Any status the classifier has no specific rule for
    HttpError { code: u16 },

    /// The transport gave up waiting for a response
    RequestTimeout,

    /// Refused, reset, DNS failure or any other connection-level error
    ConnectionFailed,
}

impl ResolutionOutcome {
    /// Every status tag, in declaration order
    pub const STATUS_TAGS: [&'static str; 6] = [
        "direct_redirect",
        "resolved_from_warning",
        "link_not_found",
        "http_error",
        "request_timeout",
        "connection_failed",
    ];

    /// The on-disk status literal
    pub fn status_tag(&self) -> &'static str {
        match self {
            Self::DirectRedirect { .. } => "direct_redirect",
            Self::ResolvedFromWarning { .. } => "resolved_from_warning",
            Self::LinkNotFound => "link_not_found",
            Self::HttpError { .. } => "http_error",
            Self::RequestTimeout => "request_timeout",
            Self::ConnectionFailed => "connection_failed",
        }
    }

    /// The real destination, for outcomes that have one
    pub fn destination(&self) -> Option<&str> {
        match self {
            Self::DirectRedirect { destination } | Self::ResolvedFromWarning { destination } => {
                Some(destination)
            }
            _ => None,
        }
    }

    /// The destination column value written to the output store
    ///
    /// `http_error` keeps its status code here as `HTTP_<code>`; outcomes
    /// without a destination write an empty field.
    pub fn destination_field(&self) -> String {
        match self {
            Self::HttpError { code } => format!("{}{}", HTTP_ERROR_PREFIX, code),
            other => other.destination().unwrap_or_default().to_string(),
        }
    }

    /// Rebuilds an outcome from the store's destination and status columns
    ///
    /// Returns None if the status is unknown or the destination column does
    /// not fit the status.
    pub fn from_fields(destination: &str, status: &str) -> Option<Self> {
        match status {
            "direct_redirect" if !destination.is_empty() => Some(Self::DirectRedirect {
                destination: destination.to_string(),
            }),
            "resolved_from_warning" if !destination.is_empty() => {
                Some(Self::ResolvedFromWarning {
                    destination: destination.to_string(),
                })
            }
            "link_not_found" => Some(Self::LinkNotFound),
            "http_error" => destination
                .strip_prefix(HTTP_ERROR_PREFIX)
                .and_then(|code| code.parse().ok())
                .map(|code| Self::HttpError { code }),
            "request_timeout" => Some(Self::RequestTimeout),
            "connection_failed" => Some(Self::ConnectionFailed),
            _ => None,
        }
    }

    /// True for outcomes that carry a real destination
    pub fn is_found(&self) -> bool {
        self.destination().is_some()
    }

    /// True for outcomes that a not-found suppressing session skips
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::LinkNotFound | Self::HttpError { code: 404 })
    }

    /// True for transport-level failures
    pub fn is_network_failure(&self) -> bool {
        matches!(self, Self::RequestTimeout | Self::ConnectionFailed)
    }
}

impl fmt::Display for ResolutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DirectRedirect { destination } | Self::ResolvedFromWarning { destination } => {
                write!(f, "{} -> {}", self.status_tag(), destination)
            }
            Self::HttpError { code } => write!(f, "{} ({})", self.status_tag(), code),
            _ => f.write_str(self.status_tag()),
        }
    }
}
