//! Destination extraction from the warning interstitial
//!
//! The interstitial replaces the redirect with a page explaining the
//! shutdown. The real destination is usually still in there somewhere: a
//! JSON blob, a query parameter, a "Continue" button, a script redirect, a
//! meta refresh, or just a bare URL in the text. Rules are tried from the
//! most structured to the most permissive and the first acceptable match
//! wins.
//!
//! A candidate URL is rejected when it points back at the shortener or at
//! any ignored domain (help pages, static assets, analytics). A rejected
//! match falls through to the next match or rule.

use crate::config::ScanSession;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

/// Shortest string that can still be a real destination URL
const MIN_URL_LEN: usize = 10;

/// A successful extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extraction {
    /// The recovered destination URL
    pub destination: String,

    /// Name of the rule that matched
    pub rule: &'static str,
}

/// A text pattern whose first capture group is the destination
#[derive(Debug)]
struct PatternRule {
    name: &'static str,
    regex: Regex,
}

/// Extracts destination URLs from interstitial page bodies
#[derive(Debug)]
pub struct InterstitialExtractor {
    /// JSON and query parameter patterns, tried before the DOM
    data_rules: Vec<PatternRule>,

    /// Script redirect patterns, tried after the continue button
    script_rules: Vec<PatternRule>,

    /// Last resort scan for any absolute URL
    bare_url: Regex,

    /// The shortener's own host
    service_host: Option<String>,

    /// Lowercased domains never accepted as destinations
    ignored_domains: Vec<String>,
}

impl InterstitialExtractor {
    /// Creates an extractor for the session's service and ignore list
    pub fn new(session: &ScanSession) -> Result<Self, regex::Error> {
        Self::with_domains(session.service_host(), &session.detection.ignored_domains)
    }

    /// Creates an extractor from an explicit service host and ignore list
    pub fn with_domains(
        service_host: Option<String>,
        ignored_domains: &[String],
    ) -> Result<Self, regex::Error> {
        let rule = |name, pattern: &str| -> Result<PatternRule, regex::Error> {
            Ok(PatternRule {
                name,
                regex: Regex::new(pattern)?,
            })
        };

        let data_rules = vec![
            rule("json_redirect_url", r#"(?i)"redirect_url"\s*:\s*"([^"]+)""#)?,
            rule("json_url", r#"(?i)"url"\s*:\s*"([^"]+)""#)?,
            rule("json_target", r#"(?i)"target"\s*:\s*"([^"]+)""#)?,
            rule("query_redirect_url", r#"(?i)\bredirect_url=([^&\s'"<>]+)"#)?,
            rule("query_url", r#"(?i)\burl=([^&\s'"<>]+)"#)?,
            rule("query_continue", r#"(?i)\bcontinue=([^&\s'"<>]+)"#)?,
        ];

        let script_rules = vec![
            rule(
                "script_location_href",
                r#"(?i)window\.location\.href\s*=\s*["']([^"']+)["']"#,
            )?,
            rule(
                "script_location",
                r#"(?i)window\.location\s*=\s*["']([^"']+)["']"#,
            )?,
            rule("script_href", r#"(?i)location\.href\s*=\s*["']([^"']+)["']"#)?,
            rule(
                "script_replace",
                r#"(?i)location\.replace\(\s*["']([^"']+)["']"#,
            )?,
        ];

        Ok(Self {
            data_rules,
            script_rules,
            bare_url: Regex::new(r#"(?i)https?://[^\s<>"']+"#)?,
            service_host: service_host.map(|h| h.to_ascii_lowercase()),
            ignored_domains: ignored_domains
                .iter()
                .map(|d| d.to_ascii_lowercase())
                .collect(),
        })
    }

    /// Searches `content` for the destination URL
    ///
    /// Returns None when nothing acceptable is found; the caller records that
    /// as `link_not_found`.
    pub fn extract(&self, content: &str) -> Option<Extraction> {
        if let Some(found) = self.apply_rules(&self.data_rules, content) {
            return Some(found);
        }

        // DOM rules run on a parsed document; it is dropped before returning
        let from_dom = {
            let document = Html::parse_document(content);
            self.continue_anchor(&document)
                .map(|url| (url, "continue_anchor"))
                .or_else(|| {
                    self.apply_rules(&self.script_rules, content)
                        .map(|e| (e.destination, e.rule))
                })
                .or_else(|| self.meta_refresh(&document).map(|url| (url, "meta_refresh")))
                .or_else(|| self.any_anchor(&document).map(|url| (url, "anchor")))
        };

        if let Some((destination, rule)) = from_dom {
            tracing::debug!("Extracted {} with rule {}", destination, rule);
            return Some(Extraction { destination, rule });
        }

        self.bare_url
            .find_iter(content)
            .filter_map(|m| self.accept(m.as_str()))
            .next()
            .map(|destination| Extraction {
                destination,
                rule: "bare_url",
            })
    }

    fn apply_rules(&self, rules: &[PatternRule], content: &str) -> Option<Extraction> {
        for rule in rules {
            for captures in rule.regex.captures_iter(content) {
                let Some(raw) = captures.get(1) else {
                    continue;
                };
                if let Some(destination) = self.accept(raw.as_str()) {
                    tracing::debug!("Extracted {} with rule {}", destination, rule.name);
                    return Some(Extraction {
                        destination,
                        rule: rule.name,
                    });
                }
            }
        }
        None
    }

    /// Anchor labelled or styled as the "Continue" button
    fn continue_anchor(&self, document: &Html) -> Option<String> {
        let selector = Selector::parse("a[href]").ok()?;

        document
            .select(&selector)
            .filter(|element| {
                let text = element.text().collect::<String>().to_ascii_lowercase();
                let class = element
                    .value()
                    .attr("class")
                    .unwrap_or("")
                    .to_ascii_lowercase();
                text.contains("continue") || class.contains("continue")
            })
            .filter_map(|element| element.value().attr("href"))
            .find_map(|href| self.accept(href))
    }

    /// `<meta http-equiv="refresh" content="0; url=...">`
    fn meta_refresh(&self, document: &Html) -> Option<String> {
        let selector = Selector::parse("meta[http-equiv][content]").ok()?;

        document
            .select(&selector)
            .filter(|element| {
                element
                    .value()
                    .attr("http-equiv")
                    .is_some_and(|v| v.eq_ignore_ascii_case("refresh"))
            })
            .filter_map(|element| element.value().attr("content"))
            .filter_map(|content| {
                let lower = content.to_ascii_lowercase();
                let start = lower.find("url=")? + "url=".len();
                Some(content[start..].trim_matches(|c| c == '\'' || c == '"' || c == ' '))
            })
            .find_map(|target| self.accept(target))
    }

    /// Any outbound link at all
    fn any_anchor(&self, document: &Html) -> Option<String> {
        let selector = Selector::parse("a[href]").ok()?;

        document
            .select(&selector)
            .filter_map(|element| element.value().attr("href"))
            .find_map(|href| self.accept(href))
    }

    /// Normalizes a raw match and returns it if it is a usable destination
    fn accept(&self, raw: &str) -> Option<String> {
        let url = normalize(raw);

        if url.len() < MIN_URL_LEN {
            return None;
        }

        // a record must stay on one CSV line
        if url.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return None;
        }

        let lower = url.to_ascii_lowercase();
        if !lower.starts_with("http://") && !lower.starts_with("https://") {
            return None;
        }

        let parsed = Url::parse(&url).ok()?;
        let host = parsed.host_str()?.to_ascii_lowercase();

        if self.service_host.as_deref().is_some_and(|s| host_matches(&host, s)) {
            return None;
        }

        if self.ignored_domains.iter().any(|d| host_matches(&host, d)) {
            return None;
        }

        Some(url)
    }
}

/// True if `host` is `domain` or one of its subdomains
fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Undoes the escaping layers a URL picks up inside a page
fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();

    // Fully percent-encoded query values, e.g. https%3A%2F%2Fexample.com
    let lower = trimmed.to_ascii_lowercase();
    let decoded = if lower.starts_with("http%3a") || lower.starts_with("https%3a") {
        let query = format!("v={}", trimmed);
        url::form_urlencoded::parse(query.as_bytes())
            .next()
            .map(|(_, value)| value.into_owned())
            .unwrap_or_else(|| trimmed.to_string())
    } else {
        trimmed.to_string()
    };

    let unescaped = decoded
        .replace("\\u003d", "=")
        .replace("\\u003D", "=")
        .replace("\\u0026", "&")
        .replace("\\/", "/")
        .replace("%3D", "=")
        .replace("%3d", "=")
        .replace("%26", "&");

    html_escape::decode_html_entities(&unescaped)
        .trim_end_matches(|c| c == '.' || c == ',' || c == ';')
        .to_string()
}
