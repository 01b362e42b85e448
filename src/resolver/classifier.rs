//! Response classification
//!
//! Each candidate gets exactly one request. The first response (redirects are
//! never followed) or the transport failure is mapped onto the fixed outcome
//! taxonomy by walking the `ResolutionState` machine:
//!
//! | First response | Path |
//! |----------------|------|
//! | transport timeout | `Requesting -> TimedOut` |
//! | other transport failure | `Requesting -> ConnectionFailed` |
//! | 3xx to an interstitial path on the shortener's host | `Requesting -> WarningDetected -> Extracting -> ...` |
//! | any other 3xx | `Requesting -> DirectRedirect` |
//! | 3xx without `Location` | `Requesting -> HttpError` |
//! | 404 | `Requesting -> NotFound` |
//! | 200 with a warning marker | `Requesting -> WarningDetected -> Extracting -> ...` |
//! | 200 with a not-found marker | `Requesting -> NotFound` |
//! | anything else | `Requesting -> HttpError` |
//!
//! No retries happen here.

use crate::config::ScanSession;
use crate::resolver::extractor::InterstitialExtractor;
use crate::resolver::transport::{HttpResponse, Transport, TransportError};
use crate::state::{ResolutionOutcome, ResolutionState};
use url::Url;

/// The result of classifying one short URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The recorded outcome
    pub outcome: ResolutionOutcome,

    /// Every state visited, starting at `Pending`
    pub trail: Vec<ResolutionState>,

    /// The extraction rule that recovered the destination, if any
    pub extraction_rule: Option<&'static str>,
}

impl Resolution {
    /// The terminal state reached
    pub fn final_state(&self) -> ResolutionState {
        self.trail
            .last()
            .copied()
            .unwrap_or(ResolutionState::Pending)
    }
}

/// Records state transitions for one classification
#[derive(Debug)]
struct Trail {
    url: String,
    states: Vec<ResolutionState>,
}

impl Trail {
    fn start(url: &str) -> Self {
        Self {
            url: url.to_string(),
            states: vec![ResolutionState::Pending],
        }
    }

    fn advance(&mut self, next: ResolutionState) {
        let current = self.current();
        debug_assert!(
            current.can_transition_to(next),
            "illegal transition {} -> {}",
            current,
            next
        );
        tracing::trace!("{}: {} -> {}", self.url, current, next);
        self.states.push(next);
    }

    fn current(&self) -> ResolutionState {
        self.states
            .last()
            .copied()
            .unwrap_or(ResolutionState::Pending)
    }

    fn finish(
        mut self,
        terminal: ResolutionState,
        outcome: ResolutionOutcome,
        extraction_rule: Option<&'static str>,
    ) -> Resolution {
        self.advance(terminal);
        debug_assert!(terminal.produces(&outcome));
        Resolution {
            outcome,
            trail: self.states,
            extraction_rule,
        }
    }
}

/// Classifies short URLs into `ResolutionOutcome`s
#[derive(Debug)]
pub struct ResponseClassifier<T> {
    transport: T,
    extractor: InterstitialExtractor,
    warning_markers: Vec<String>,
    /// Lowercased; matched case-insensitively
    not_found_markers: Vec<String>,
    service_host: Option<String>,
    interstitial_paths: Vec<String>,
}

impl<T: Transport> ResponseClassifier<T> {
    /// Creates a classifier for the session's service
    pub fn new(transport: T, session: &ScanSession) -> Result<Self, regex::Error> {
        Ok(Self {
            transport,
            extractor: InterstitialExtractor::new(session)?,
            warning_markers: session
                .detection
                .warning_markers
                .iter()
                .filter(|m| !m.is_empty())
                .cloned()
                .collect(),
            not_found_markers: session
                .detection
                .not_found_markers
                .iter()
                .map(|m| m.to_lowercase())
                .collect(),
            service_host: session.service_host().map(|h| h.to_ascii_lowercase()),
            interstitial_paths: session.detection.interstitial_paths.clone(),
        })
    }

    /// Issues the request for `short_url` and classifies the outcome
    pub async fn resolve(&self, short_url: &str) -> Resolution {
        let mut trail = Trail::start(short_url);
        trail.advance(ResolutionState::Requesting);

        match self.transport.get(short_url).await {
            Ok(response) => self.classify_in(trail, short_url, &response),
            Err(TransportError::Timeout) => trail.finish(
                ResolutionState::TimedOut,
                ResolutionOutcome::RequestTimeout,
                None,
            ),
            Err(TransportError::Connection(reason)) => {
                tracing::debug!("Connection failure for {}: {}", short_url, reason);
                trail.finish(
                    ResolutionState::ConnectionFailed,
                    ResolutionOutcome::ConnectionFailed,
                    None,
                )
            }
        }
    }

    /// Classifies a response that has already been received
    pub fn classify_response(&self, short_url: &str, response: &HttpResponse) -> Resolution {
        let mut trail = Trail::start(short_url);
        trail.advance(ResolutionState::Requesting);
        self.classify_in(trail, short_url, response)
    }

    fn classify_in(&self, mut trail: Trail, short_url: &str, response: &HttpResponse) -> Resolution {
        let code = response.status;

        if response.is_redirect() {
            let Some(location) = response.location() else {
                return trail.finish(
                    ResolutionState::HttpError,
                    ResolutionOutcome::HttpError { code },
                    None,
                );
            };

            let target = absolutize(short_url, location);
            if self.is_interstitial_url(&target) {
                trail.advance(ResolutionState::WarningDetected);
                return self.extract_in(trail, short_url, &[&response.body, &target]);
            }

            return trail.finish(
                ResolutionState::DirectRedirect,
                ResolutionOutcome::DirectRedirect {
                    destination: target,
                },
                None,
            );
        }

        if code == 404 {
            return trail.finish(
                ResolutionState::NotFound,
                ResolutionOutcome::LinkNotFound,
                None,
            );
        }

        if code == 200 {
            if self.is_warning_page(&response.body) {
                trail.advance(ResolutionState::WarningDetected);
                return self.extract_in(trail, short_url, &[&response.body]);
            }

            if self.is_not_found_page(&response.body) {
                return trail.finish(
                    ResolutionState::NotFound,
                    ResolutionOutcome::LinkNotFound,
                    None,
                );
            }
        }

        trail.finish(
            ResolutionState::HttpError,
            ResolutionOutcome::HttpError { code },
            None,
        )
    }

    /// Runs the extractor over each source in order
    fn extract_in(&self, mut trail: Trail, short_url: &str, sources: &[&str]) -> Resolution {
        trail.advance(ResolutionState::Extracting);

        match sources.iter().find_map(|source| self.extractor.extract(source)) {
            Some(found) => trail.finish(
                ResolutionState::ResolvedFromWarning,
                ResolutionOutcome::ResolvedFromWarning {
                    destination: found.destination,
                },
                Some(found.rule),
            ),
            None => {
                tracing::warn!("Could not extract redirect from warning page for {}", short_url);
                trail.finish(
                    ResolutionState::ExtractionFailed,
                    ResolutionOutcome::LinkNotFound,
                    None,
                )
            }
        }
    }

    fn is_warning_page(&self, body: &str) -> bool {
        self.warning_markers.iter().any(|m| body.contains(m.as_str()))
    }

    fn is_not_found_page(&self, body: &str) -> bool {
        let lower = body.to_lowercase();
        self.not_found_markers
            .iter()
            .any(|m| lower.contains(m.as_str()))
    }

    /// True if `url` is the shortener's own warning interstitial
    ///
    /// Other paths on the service host are ordinary destinations.
    fn is_interstitial_url(&self, url: &str) -> bool {
        let Some(service) = &self.service_host else {
            return false;
        };
        let Ok(url) = Url::parse(url) else {
            return false;
        };
        if !url.host_str().is_some_and(|h| h.eq_ignore_ascii_case(service)) {
            return false;
        }

        let path = url.path();
        self.interstitial_paths.iter().any(|prefix| {
            path.strip_prefix(prefix.trim_end_matches('/'))
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }
}

/// Resolves a possibly relative `Location` against the request URL
///
/// Absolute locations are returned untouched.
fn absolutize(base: &str, location: &str) -> String {
    if Url::parse(location).is_ok() {
        return location.to_string();
    }
    Url::parse(base)
        .and_then(|base| base.join(location))
        .map(|url| url.to_string())
        .unwrap_or_else(|_| location.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    const SHORT_URL: &str = "https://goo.gl/abcd";
    const WARNING: &str = "<html><body><h1>This link will no longer work</h1>";

    /// Returns the same canned result for every request
    struct CannedTransport(Result<HttpResponse, TransportError>);

    #[async_trait]
    impl Transport for CannedTransport {
        async fn get(&self, _url: &str) -> Result<HttpResponse, TransportError> {
            self.0.clone()
        }
    }

    fn classifier(
        result: Result<HttpResponse, TransportError>,
    ) -> ResponseClassifier<CannedTransport> {
        ResponseClassifier::new(CannedTransport(result), &ScanSession::default()).unwrap()
    }

    fn classify(response: HttpResponse) -> Resolution {
        classifier(Ok(response.clone())).classify_response(SHORT_URL, &response)
    }

    #[test]
    fn test_direct_redirect() {
        let resolution = classify(HttpResponse::new(301).with_location("https://example.com/page"));

        assert_eq!(
            resolution.outcome,
            ResolutionOutcome::DirectRedirect {
                destination: "https://example.com/page".to_string()
            }
        );
        assert_eq!(
            resolution.trail,
            vec![
                ResolutionState::Pending,
                ResolutionState::Requesting,
                ResolutionState::DirectRedirect
            ]
        );
    }

    #[test]
    fn test_relative_redirect_is_absolutized() {
        let resolution = classify(HttpResponse::new(302).with_location("/interstitial?url=https://dest.example.com/a"));
        // joined onto the shortener host, where /interstitial is the warning page
        assert_eq!(
            resolution.outcome,
            ResolutionOutcome::ResolvedFromWarning {
                destination: "https://dest.example.com/a".to_string()
            }
        );
        assert_eq!(resolution.extraction_rule, Some("query_url"));
    }

    #[test]
    fn test_redirect_to_other_service_path_is_direct() {
        let resolution = classify(HttpResponse::new(301).with_location("https://goo.gl/maps/xyz123"));

        assert_eq!(
            resolution.outcome,
            ResolutionOutcome::DirectRedirect {
                destination: "https://goo.gl/maps/xyz123".to_string()
            }
        );
        assert_eq!(
            resolution.trail,
            vec![
                ResolutionState::Pending,
                ResolutionState::Requesting,
                ResolutionState::DirectRedirect
            ]
        );

        // a shared prefix is not enough
        let resolution = classify(HttpResponse::new(302).with_location("/warnings-archive/abc"));
        assert_eq!(resolution.final_state(), ResolutionState::DirectRedirect);
    }

    #[test]
    fn test_interstitial_paths_are_configurable() {
        let mut session = ScanSession::default();
        session.detection.interstitial_paths = vec!["/notice/".to_string()];
        let response = HttpResponse::new(302)
            .with_location("https://goo.gl/notice/abcd?url=https%3A%2F%2Fdest.example.org%2F");
        let classifier =
            ResponseClassifier::new(CannedTransport(Ok(response.clone())), &session).unwrap();

        let resolution = classifier.classify_response(SHORT_URL, &response);
        assert_eq!(
            resolution.outcome,
            ResolutionOutcome::ResolvedFromWarning {
                destination: "https://dest.example.org/".to_string()
            }
        );

        let moved = HttpResponse::new(302).with_location("https://goo.gl/interstitial");
        let resolution = classifier.classify_response(SHORT_URL, &moved);
        assert_eq!(resolution.final_state(), ResolutionState::DirectRedirect);
    }

    #[test]
    fn test_redirect_without_location() {
        let resolution = classify(HttpResponse::new(302));
        assert_eq!(resolution.outcome, ResolutionOutcome::HttpError { code: 302 });
        assert_eq!(resolution.final_state(), ResolutionState::HttpError);
    }

    #[test]
    fn test_redirect_to_interstitial_without_destination() {
        let resolution = classify(
            HttpResponse::new(302)
                .with_location("https://goo.gl/warning")
                .with_body("moved"),
        );
        assert_eq!(resolution.outcome, ResolutionOutcome::LinkNotFound);
        assert_eq!(resolution.final_state(), ResolutionState::ExtractionFailed);
    }

    #[test]
    fn test_warning_page_extracted() {
        let body = format!(
            r#"{}<a href="https://example.com/real-target">https://example.com/real-target</a></body></html>"#,
            WARNING
        );
        let resolution = classify(HttpResponse::new(200).with_body(body));

        assert_eq!(
            resolution.outcome,
            ResolutionOutcome::ResolvedFromWarning {
                destination: "https://example.com/real-target".to_string()
            }
        );
        assert_eq!(
            resolution.trail,
            vec![
                ResolutionState::Pending,
                ResolutionState::Requesting,
                ResolutionState::WarningDetected,
                ResolutionState::Extracting,
                ResolutionState::ResolvedFromWarning
            ]
        );
    }

    #[test]
    fn test_warning_page_only_navigation_links() {
        let body = format!(
            r#"{}<a href="https://goo.gl/">goo.gl</a><a href="https://developers.google.com/x">Learn more</a></body></html>"#,
            WARNING
        );
        let resolution = classify(HttpResponse::new(200).with_body(body));

        assert_eq!(resolution.outcome, ResolutionOutcome::LinkNotFound);
        assert_eq!(resolution.final_state(), ResolutionState::ExtractionFailed);
    }

    #[test]
    fn test_warning_marker_checked_before_not_found() {
        // the warning page mentions "not found" in its own text
        let body = format!(
            r#"{}<p>Links not found here will stop working.</p><a href="https://x.example.com/ok">ok</a>"#,
            WARNING
        );
        let resolution = classify(HttpResponse::new(200).with_body(body));
        assert!(matches!(
            resolution.outcome,
            ResolutionOutcome::ResolvedFromWarning { .. }
        ));
    }

    #[test]
    fn test_status_404() {
        let resolution = classify(HttpResponse::new(404));
        assert_eq!(resolution.outcome, ResolutionOutcome::LinkNotFound);
        assert_eq!(resolution.final_state(), ResolutionState::NotFound);
    }

    #[test]
    fn test_not_found_marker() {
        let resolution =
            classify(HttpResponse::new(200).with_body("<h1>Dynamic Link Not Found</h1>"));
        assert_eq!(resolution.outcome, ResolutionOutcome::LinkNotFound);

        let resolution = classify(HttpResponse::new(200).with_body("<p>Page NOT FOUND</p>"));
        assert_eq!(resolution.outcome, ResolutionOutcome::LinkNotFound);
    }

    #[test]
    fn test_unrecognized_200() {
        let resolution = classify(HttpResponse::new(200).with_body("<p>hello</p>"));
        assert_eq!(resolution.outcome, ResolutionOutcome::HttpError { code: 200 });
    }

    #[test]
    fn test_other_status() {
        let resolution = classify(HttpResponse::new(503).with_body("unavailable"));
        assert_eq!(resolution.outcome, ResolutionOutcome::HttpError { code: 503 });
    }

    #[tokio::test]
    async fn test_resolve_timeout() {
        let resolution = classifier(Err(TransportError::Timeout))
            .resolve(SHORT_URL)
            .await;
        assert_eq!(resolution.outcome, ResolutionOutcome::RequestTimeout);
        assert_eq!(resolution.final_state(), ResolutionState::TimedOut);
    }

    #[tokio::test]
    async fn test_resolve_connection_failure() {
        let resolution = classifier(Err(TransportError::Connection("refused".to_string())))
            .resolve(SHORT_URL)
            .await;
        assert_eq!(resolution.outcome, ResolutionOutcome::ConnectionFailed);
    }

    #[tokio::test]
    async fn test_resolve_uses_transport_response() {
        let response = HttpResponse::new(307).with_location("https://elsewhere.example.org/");
        let resolution = classifier(Ok(response)).resolve(SHORT_URL).await;
        assert_eq!(
            resolution.outcome.destination(),
            Some("https://elsewhere.example.org/")
        );
    }

    #[test]
    fn test_absolutize() {
        assert_eq!(
            absolutize("https://goo.gl/abcd", "/x"),
            "https://goo.gl/x"
        );
        assert_eq!(
            absolutize("https://goo.gl/abcd", "https://a.example/b"),
            "https://a.example/b"
        );
        assert_eq!(absolutize("https://goo.gl/abcd", "https://x"), "https://x");
    }
}
