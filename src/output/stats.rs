//! Statistics over an existing output store
//!
//! Reads the whole store front to back; intended for the `--stats` command,
//! not for the scan loop.

use crate::state::ResolutionOutcome;
use crate::storage::ScanRecord;
use crate::{StoreError, StoreResult};
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::path::Path;

/// Store statistics summary
#[derive(Debug, Clone, Default)]
pub struct ScanStatistics {
    /// Parsed records, excluding the header
    pub total_records: u64,

    /// Count of records by status tag
    pub by_status: HashMap<&'static str, u64>,

    /// Count of records by suffix length
    pub by_length: BTreeMap<usize, u64>,

    /// Rows that could not be parsed as records
    pub malformed: u64,

    /// Distinct destination URLs among found links
    pub unique_destinations: u64,

    pub first_timestamp: Option<NaiveDateTime>,
    pub last_timestamp: Option<NaiveDateTime>,
}

impl ScanStatistics {
    pub fn count(&self, status: &str) -> u64 {
        self.by_status.get(status).copied().unwrap_or(0)
    }

    /// Records that resolved to a destination
    pub fn found(&self) -> u64 {
        self.count("direct_redirect") + self.count("resolved_from_warning")
    }

    fn add(&mut self, record: &ScanRecord) {
        self.total_records += 1;
        *self.by_status.entry(record.outcome.status_tag()).or_insert(0) += 1;
        *self.by_length.entry(record.suffix().len()).or_insert(0) += 1;

        self.first_timestamp = Some(match self.first_timestamp {
            Some(first) => first.min(record.timestamp),
            None => record.timestamp,
        });
        self.last_timestamp = Some(match self.last_timestamp {
            Some(last) => last.max(record.timestamp),
            None => record.timestamp,
        });
    }
}

/// Loads statistics from the store at `path`
///
/// Malformed rows are counted, not fatal; only I/O failures are errors.
pub fn load_statistics(path: &Path) -> StoreResult<ScanStatistics> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|source| StoreError::Csv {
            path: path.to_path_buf(),
            source,
        })?;

    let mut stats = ScanStatistics::default();
    let mut destinations = std::collections::HashSet::new();

    for row in reader.records() {
        let row = match row {
            Ok(row) => row,
            Err(e) if e.is_io_error() => {
                return Err(StoreError::Csv {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
            Err(e) => {
                tracing::debug!("Unreadable row in {}: {}", path.display(), e);
                stats.malformed += 1;
                continue;
            }
        };

        match ScanRecord::from_fields(&row) {
            Ok(record) => {
                if let ResolutionOutcome::DirectRedirect { destination }
                | ResolutionOutcome::ResolvedFromWarning { destination } = &record.outcome
                {
                    destinations.insert(destination.clone());
                }
                stats.add(&record);
            }
            Err(reason) => {
                tracing::debug!("Malformed row in {}: {}", path.display(), reason);
                stats.malformed += 1;
            }
        }
    }

    stats.unique_destinations = destinations.len() as u64;
    Ok(stats)
}

/// Renders statistics as the text printed by `--stats`
pub fn format_statistics(stats: &ScanStatistics) -> String {
    let mut out = String::new();

    // writing to a String cannot fail
    let _ = writeln!(out, "=== Scan Statistics ===\n");
    let _ = writeln!(out, "Overview:");
    let _ = writeln!(out, "  Total records: {}", stats.total_records);
    let _ = writeln!(out, "  Found links: {}", stats.found());
    let _ = writeln!(out, "  Unique destinations: {}", stats.unique_destinations);
    if stats.malformed > 0 {
        let _ = writeln!(out, "  Malformed rows: {}", stats.malformed);
    }
    if let (Some(first), Some(last)) = (stats.first_timestamp, stats.last_timestamp) {
        let _ = writeln!(out, "  Time span: {} .. {}", first, last);
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Records by Status:");
    for status in ResolutionOutcome::STATUS_TAGS {
        let count = stats.count(status);
        let percentage = if stats.total_records > 0 {
            (count as f64 / stats.total_records as f64) * 100.0
        } else {
            0.0
        };
        let _ = writeln!(out, "  {}: {} ({:.1}%)", status, count, percentage);
    }

    if !stats.by_length.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Records by Length:");
        for (length, count) in &stats.by_length {
            let _ = writeln!(out, "  {}: {}", length, count);
        }
    }

    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &ScanStatistics) {
    print!("{}", format_statistics(stats));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const STORE: &str = "short_url,destination_url,status,timestamp\n\
https://goo.gl/aaaa,,link_not_found,2025-07-01 12:00:00\n\
https://goo.gl/aaab,https://x.example/,direct_redirect,2025-07-01 12:00:01\n\
https://goo.gl/aaac,https://x.example/,resolved_from_warning,2025-07-01 12:00:02\n\
https://goo.gl/aaad,HTTP_500,http_error,2025-07-01 12:00:03\n\
https://goo.gl/ab,,request_timeout,2025-07-02 08:00:00\n\
this row is broken\n\
https://goo.gl/aaae,,bogus,2025-07-01 12:00:04\n";

    fn stats() -> ScanStatistics {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, STORE).unwrap();
        load_statistics(&path).unwrap()
    }

    #[test]
    fn test_counts() {
        let stats = stats();
        assert_eq!(stats.total_records, 5);
        assert_eq!(stats.malformed, 2);
        assert_eq!(stats.found(), 2);
        assert_eq!(stats.unique_destinations, 1);
        assert_eq!(stats.count("http_error"), 1);
        assert_eq!(stats.count("connection_failed"), 0);
        assert_eq!(stats.by_length.get(&4), Some(&4));
        assert_eq!(stats.by_length.get(&2), Some(&1));
    }

    #[test]
    fn test_time_span() {
        let stats = stats();
        assert_eq!(
            stats.first_timestamp.unwrap().to_string(),
            "2025-07-01 12:00:00"
        );
        assert_eq!(
            stats.last_timestamp.unwrap().to_string(),
            "2025-07-02 08:00:00"
        );
    }

    #[test]
    fn test_format_lists_every_status() {
        let text = format_statistics(&stats());
        for status in ResolutionOutcome::STATUS_TAGS {
            assert!(text.contains(status), "missing {}", status);
        }
        assert!(text.contains("Malformed rows: 2"));
    }

    #[test]
    fn test_missing_store() {
        let dir = TempDir::new().unwrap();
        assert!(load_statistics(&dir.path().join("none.csv")).is_err());
    }
}
