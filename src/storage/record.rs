use crate::config::suffix_of;
use crate::state::ResolutionOutcome;
use chrono::{Local, NaiveDateTime, Timelike};

/// Column names, written once as the first line of every store
pub const HEADER: [&str; 4] = ["short_url", "destination_url", "status", "timestamp"];

/// On-disk timestamp format (local time, second precision)
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One line of the output store
///
/// The ordered sequence of records is the authoritative progress log of a
/// scan; records are only ever appended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRecord {
    pub short_url: String,
    pub outcome: ResolutionOutcome,
    pub timestamp: NaiveDateTime,
}

impl ScanRecord {
    /// Creates a record stamped with the current local time
    pub fn new(short_url: impl Into<String>, outcome: ResolutionOutcome) -> Self {
        let now = Local::now().naive_local();
        Self::with_timestamp(short_url, outcome, now.with_nanosecond(0).unwrap_or(now))
    }

    pub fn with_timestamp(
        short_url: impl Into<String>,
        outcome: ResolutionOutcome,
        timestamp: NaiveDateTime,
    ) -> Self {
        Self {
            short_url: short_url.into(),
            outcome,
            timestamp,
        }
    }

    /// The candidate portion of the short URL
    pub fn suffix(&self) -> &str {
        suffix_of(&self.short_url)
    }

    /// The four CSV fields in column order
    pub fn to_fields(&self) -> [String; 4] {
        [
            self.short_url.clone(),
            self.outcome.destination_field(),
            self.outcome.status_tag().to_string(),
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
        ]
    }

    /// Parses a record from its CSV fields
    ///
    /// Returns a description of the problem if the fields do not form a
    /// valid record.
    pub fn from_fields(fields: &csv::StringRecord) -> Result<Self, String> {
        if fields.len() != HEADER.len() {
            return Err(format!(
                "expected {} fields, found {}",
                HEADER.len(),
                fields.len()
            ));
        }

        let short_url = &fields[0];
        let destination = &fields[1];
        let status = &fields[2];
        let timestamp = &fields[3];

        if short_url.is_empty() {
            return Err("empty short_url".to_string());
        }

        let outcome = ResolutionOutcome::from_fields(destination, status)
            .ok_or_else(|| format!("unknown status '{}' for destination '{}'", status, destination))?;

        let timestamp = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
            .map_err(|e| format!("bad timestamp '{}': {}", timestamp, e))?;

        Ok(Self::with_timestamp(short_url, outcome, timestamp))
    }

    /// Parses a single CSV line
    pub fn parse_line(line: &str) -> Result<Self, String> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(line.as_bytes());

        let mut fields = csv::StringRecord::new();
        match reader.read_record(&mut fields) {
            Ok(true) => Self::from_fields(&fields),
            Ok(false) => Err("empty line".to_string()),
            Err(e) => Err(e.to_string()),
        }
    }
}

/// True if `line` is the store's header row
pub fn is_header(line: &str) -> bool {
    line.trim_end() == HEADER.join(",")
}
