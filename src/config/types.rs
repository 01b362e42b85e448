use crate::candidate::Candidate;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Browser user agent sent with every request
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Process-wide configuration for one scan session
///
/// Built once at startup (TOML file, then command-line overrides), validated,
/// and never modified afterwards.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScanSession {
    pub scan: ScanConfig,
    pub http: HttpConfig,
    pub detection: DetectionConfig,
}

/// Enumeration and persistence settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ScanConfig {
    /// Candidate length L
    pub length: usize,

    /// Minimum interval between request starts, in seconds
    pub delay_seconds: f64,

    /// CSV output store
    pub output_path: PathBuf,

    /// Do not persist `link_not_found` / `http_error(404)` outcomes
    pub skip_not_found: bool,

    /// Explicit resume candidate; overrides the store
    pub start_from: Option<String>,

    /// Stop after this many attempts
    pub max_requests: Option<u64>,

    /// Log a progress line every N attempts
    pub progress_interval: u64,

    /// fsync the store after every record
    pub sync_writes: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            length: 6,
            delay_seconds: 1.0,
            output_path: PathBuf::from("goo.gl_urls.csv"),
            skip_not_found: false,
            start_from: None,
            max_requests: None,
            progress_interval: 100,
            sync_writes: true,
        }
    }
}

/// Transport settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct HttpConfig {
    /// Short URL prefix; candidates are appended to it
    pub base_url: String,

    /// Whole-request timeout, in seconds
    pub timeout_seconds: u64,

    pub user_agent: String,

    /// Cookie header that pre-dismisses the warning interstitial
    pub dismiss_cookie: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: "https://goo.gl/".to_string(),
            timeout_seconds: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            dismiss_cookie: Some("googol_warning_dismissed=true".to_string()),
        }
    }
}

/// Page recognition settings for the classifier and extractor
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DetectionConfig {
    /// Text that identifies the warning interstitial (case sensitive)
    pub warning_markers: Vec<String>,

    /// Text that identifies a not-found page (case insensitive)
    pub not_found_markers: Vec<String>,

    /// Domains never accepted as an extracted destination
    pub ignored_domains: Vec<String>,

    /// Paths on the service host that serve the warning interstitial
    pub interstitial_paths: Vec<String>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();

        Self {
            warning_markers: strings(&[
                "This link will no longer work",
                "goo.gl links will no longer function",
            ]),
            not_found_markers: strings(&["Dynamic Link Not Found", "not found"]),
            ignored_domains: strings(&[
                "google.com",
                "goo.gl",
                "googleapis.com",
                "googleusercontent.com",
                "gstatic.com",
                "googletagmanager.com",
                "googlesyndication.com",
                "doubleclick.net",
                "googlebots.com",
            ]),
            interstitial_paths: strings(&["/interstitial", "/warning"]),
        }
    }
}

impl HttpConfig {
    /// Whole-request and connect timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl ScanSession {
    /// Rate limiter interval
    pub fn delay(&self) -> Duration {
        Duration::from_secs_f64(self.scan.delay_seconds.max(0.0))
    }

    /// Full short URL for a candidate
    pub fn short_url(&self, candidate: &Candidate) -> String {
        format!("{}{}", self.http.base_url, candidate)
    }

    /// Host of the shortener itself, e.g. `goo.gl`
    pub fn service_host(&self) -> Option<String> {
        url::Url::parse(&self.http.base_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
    }
}

/// Extracts the suffix portion of a short URL
///
/// This is the last path segment with any query or fragment removed.
pub fn suffix_of(short_url: &str) -> &str {
    let end = short_url.find(['?', '#']).unwrap_or(short_url.len());
    let path = &short_url[..end];
    path.rsplit('/').next().unwrap_or(path)
}
