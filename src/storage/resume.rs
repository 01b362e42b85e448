use crate::candidate::Candidate;
use crate::storage::record::{is_header, ScanRecord};
use crate::storage::reverse::ReverseLines;
use crate::{Result, ScanError};
use std::fs::File;
use std::path::Path;

/// Where a scan session should start
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumePoint {
    /// Next candidate to attempt
    Start(Candidate),

    /// The store already covers the greatest candidate of this length
    Exhausted { last: Candidate },
}

impl ResumePoint {
    pub fn candidate(&self) -> Option<&Candidate> {
        match self {
            ResumePoint::Start(candidate) => Some(candidate),
            ResumePoint::Exhausted { .. } => None,
        }
    }
}

/// Determines the resume point for a session of candidate length `length`
///
/// An explicit override wins and is used verbatim. Otherwise the store is
/// walked from its last line backwards until a record of this length under
/// `base_url` is found; the resume point is that record's successor. Records
/// for other lengths or other services (e.g. single-URL tests) are skipped.
/// A missing or empty store starts from the smallest candidate.
///
/// # Errors
///
/// * [`ScanError::InvalidCandidate`] - the override is malformed
/// * [`ScanError::CorruptResumeState`] - a line reached while walking back
///   cannot be parsed, so the frontier cannot be trusted
pub fn locate_resume_point(
    path: &Path,
    base_url: &str,
    length: usize,
    explicit: Option<&str>,
) -> Result<ResumePoint> {
    if let Some(text) = explicit {
        let candidate = Candidate::parse(text, length)?;
        tracing::info!("Starting from explicit candidate {}", candidate);
        return Ok(ResumePoint::Start(candidate));
    }

    let Some(last) = last_recorded(path, base_url, length)? else {
        tracing::debug!("No prior records of length {} in {}", length, path.display());
        return Ok(ResumePoint::Start(Candidate::first(length)));
    };

    match last.successor() {
        Some(next) => {
            tracing::info!("Resuming after {} from {}", last, path.display());
            Ok(ResumePoint::Start(next))
        }
        None => Ok(ResumePoint::Exhausted { last }),
    }
}

/// Finds the last candidate of `length` recorded under `base_url`
fn last_recorded(path: &Path, base_url: &str, length: usize) -> Result<Option<Candidate>> {
    let corrupt = |reason: String| ScanError::CorruptResumeState {
        path: path.to_path_buf(),
        reason,
    };

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(corrupt(e.to_string())),
    };

    let lines = ReverseLines::new(file).map_err(|e| corrupt(e.to_string()))?;
    for line in lines {
        let line = line.map_err(|e| corrupt(e.to_string()))?;
        if is_header(&line) {
            break;
        }

        let record = ScanRecord::parse_line(&line)
            .map_err(|reason| corrupt(format!("malformed record '{}': {}", line, reason)))?;

        let Some(suffix) = record.short_url.strip_prefix(base_url) else {
            tracing::trace!("Skipping record of another service: {}", record.short_url);
            continue;
        };
        if suffix.len() != length {
            tracing::trace!("Skipping record of another length: {}", record.short_url);
            continue;
        }

        match Candidate::parse(suffix, length) {
            Ok(candidate) => return Ok(Some(candidate)),
            Err(_) => {
                tracing::trace!("Skipping record with foreign suffix: {}", record.short_url);
            }
        }
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const BASE: &str = "https://goo.gl/";
    const HEADER_LINE: &str = "short_url,destination_url,status,timestamp\n";

    fn store(dir: &TempDir, body: &str) -> std::path::PathBuf {
        let path = dir.path().join("out.csv");
        std::fs::write(&path, format!("{}{}", HEADER_LINE, body)).unwrap();
        path
    }

    fn start(point: ResumePoint) -> String {
        point.candidate().unwrap().to_string()
    }

    #[test]
    fn test_missing_store_starts_at_first() {
        let dir = TempDir::new().unwrap();
        let point = locate_resume_point(&dir.path().join("none.csv"), BASE, 4, None).unwrap();
        assert_eq!(start(point), "aaaa");
    }

    #[test]
    fn test_header_only_starts_at_first() {
        let dir = TempDir::new().unwrap();
        let path = store(&dir, "");
        assert_eq!(start(locate_resume_point(&path, BASE, 3, None).unwrap()), "aaa");
    }

    #[test]
    fn test_successor_of_last_record() {
        let dir = TempDir::new().unwrap();
        let path = store(
            &dir,
            "https://goo.gl/abcc,https://x,direct_redirect,2025-07-01 12:00:00\n\
             https://goo.gl/abcd,,link_not_found,2025-07-01 12:00:01\n",
        );
        assert_eq!(start(locate_resume_point(&path, BASE, 4, None).unwrap()), "abce");
    }

    #[test]
    fn test_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = store(&dir, "https://goo.gl/aaa9,,request_timeout,2025-07-01 12:00:00\n");

        let first = locate_resume_point(&path, BASE, 4, None).unwrap();
        let second = locate_resume_point(&path, BASE, 4, None).unwrap();
        assert_eq!(first, second);
        assert_eq!(start(first), "aaba");
    }

    #[test]
    fn test_skips_other_lengths() {
        let dir = TempDir::new().unwrap();
        let path = store(
            &dir,
            "https://goo.gl/abcd,,link_not_found,2025-07-01 12:00:00\n\
             https://goo.gl/zz,,link_not_found,2025-07-01 12:00:01\n\
             https://goo.gl/abcdef,,link_not_found,2025-07-01 12:00:02\n",
        );
        assert_eq!(start(locate_resume_point(&path, BASE, 4, None).unwrap()), "abce");
        assert_eq!(start(locate_resume_point(&path, BASE, 2, None).unwrap()), "zA");
        assert_eq!(start(locate_resume_point(&path, BASE, 5, None).unwrap()), "aaaaa");
    }

    #[test]
    fn test_corrupt_last_line() {
        let dir = TempDir::new().unwrap();
        let path = store(
            &dir,
            "https://goo.gl/abcd,,link_not_found,2025-07-01 12:00:00\n\
             https://goo.gl/abce,,link_no",
        );
        assert!(matches!(
            locate_resume_point(&path, BASE, 4, None),
            Err(ScanError::CorruptResumeState { .. })
        ));
    }

    #[test]
    fn test_explicit_override() {
        let dir = TempDir::new().unwrap();
        let path = store(&dir, "garbage that would not parse\n");

        let point = locate_resume_point(&path, BASE, 4, Some("Zz09")).unwrap();
        assert_eq!(start(point), "Zz09");

        assert!(matches!(
            locate_resume_point(&path, BASE, 4, Some("abc")),
            Err(ScanError::InvalidCandidate { .. })
        ));
        assert!(matches!(
            locate_resume_point(&path, BASE, 4, Some("ab-d")),
            Err(ScanError::InvalidCandidate { .. })
        ));
    }

    #[test]
    fn test_exhausted_space() {
        let dir = TempDir::new().unwrap();
        let path = store(&dir, "https://goo.gl/99,,link_not_found,2025-07-01 12:00:00\n");

        let point = locate_resume_point(&path, BASE, 2, None).unwrap();
        assert_eq!(
            point,
            ResumePoint::Exhausted {
                last: Candidate::last(2)
            }
        );
        assert!(point.candidate().is_none());
    }

    #[test]
    fn test_skips_records_of_other_services() {
        let dir = TempDir::new().unwrap();
        let path = store(
            &dir,
            "https://goo.gl/abcd,,link_not_found,2025-07-01 12:00:00\n\
             https://bit.ly/9999,https://x.example/,direct_redirect,2025-07-01 12:00:01\n\
             https://goo.gl/abce?x=1,,link_not_found,2025-07-01 12:00:02\n\
             https://goo.gl/a/bcd,,link_not_found,2025-07-01 12:00:03\n",
        );

        let point = locate_resume_point(&path, BASE, 4, None).unwrap();
        assert_eq!(start(point), "abce");
    }
}
