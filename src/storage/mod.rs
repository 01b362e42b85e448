//! Storage module for the scan's output store
//!
//! The output store is a single append-only CSV file and doubles as the
//! progress log of the scan. This module handles:
//! - The record format and its on-disk encoding
//! - Durable, flushed appends (the only writer of the store)
//! - Locating the resume point from the store's tail

mod record;
mod resume;
mod reverse;
mod writer;

pub use record::{is_header, ScanRecord, HEADER, TIMESTAMP_FORMAT};
pub use resume::{locate_resume_point, ResumePoint};
pub use reverse::ReverseLines;
pub use writer::RecordWriter;
