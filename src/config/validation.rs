use crate::candidate::MAX_LENGTH;
use crate::config::types::{DetectionConfig, HttpConfig, ScanConfig, ScanSession};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
///
/// The explicit `start-from` override is not checked here; the resume
/// locator rejects it against the session length.
pub fn validate(session: &ScanSession) -> Result<(), ConfigError> {
    validate_scan_config(&session.scan)?;
    validate_http_config(&session.http)?;
    validate_detection_config(&session.detection)?;
    Ok(())
}

/// Validates enumeration and persistence settings
fn validate_scan_config(config: &ScanConfig) -> Result<(), ConfigError> {
    if config.length < 1 || config.length > MAX_LENGTH {
        return Err(ConfigError::Validation(format!(
            "length must be between 1 and {}, got {}",
            MAX_LENGTH, config.length
        )));
    }

    if !config.delay_seconds.is_finite() || config.delay_seconds < 0.0 {
        return Err(ConfigError::Validation(format!(
            "delay_seconds must be a finite value >= 0, got {}",
            config.delay_seconds
        )));
    }

    if config.output_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output_path cannot be empty".to_string(),
        ));
    }

    if config.progress_interval < 1 {
        return Err(ConfigError::Validation(
            "progress_interval must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates transport settings
fn validate_http_config(config: &HttpConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must use http or https",
            config.base_url
        )));
    }

    if url.host_str().is_none() {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' has no host",
            config.base_url
        )));
    }

    // Candidates are appended verbatim
    if !config.base_url.ends_with('/') || url.query().is_some() || url.fragment().is_some() {
        return Err(ConfigError::InvalidUrl(format!(
            "base_url '{}' must end with '/' and carry no query or fragment",
            config.base_url
        )));
    }

    if config.timeout_seconds < 1 {
        return Err(ConfigError::Validation(
            "timeout_seconds must be >= 1".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates page recognition settings
fn validate_detection_config(config: &DetectionConfig) -> Result<(), ConfigError> {
    if config.warning_markers.iter().all(|m| m.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "at least one warning marker is required".to_string(),
        ));
    }

    if config.not_found_markers.iter().any(|m| m.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "not_found_markers cannot contain empty entries".to_string(),
        ));
    }

    for domain in &config.ignored_domains {
        validate_domain_string(domain)?;
    }

    for path in &config.interstitial_paths {
        if !path.starts_with('/') || path.trim_end_matches('/').is_empty() {
            return Err(ConfigError::Validation(format!(
                "interstitial path '{}' must start with '/' and name a path",
                path
            )));
        }
    }

    Ok(())
}

/// Validates a bare domain string
fn validate_domain_string(domain: &str) -> Result<(), ConfigError> {
    if domain.is_empty() {
        return Err(ConfigError::InvalidDomain(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::InvalidDomain(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::InvalidDomain(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::InvalidDomain(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    if !domain.contains('.') {
        return Err(ConfigError::InvalidDomain(format!(
            "Domain '{}' must contain at least one dot (e.g., 'example.com')",
            domain
        )));
    }

    Ok(())
}
