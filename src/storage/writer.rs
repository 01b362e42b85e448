use crate::storage::record::{ScanRecord, HEADER};
use crate::{StoreError, StoreResult};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Append-only CSV writer for the output store
///
/// Each record is flushed before `append` returns, and optionally synced to
/// disk, so a crash loses at most the record in flight. The writer is the
/// only component that opens the store for writing.
#[derive(Debug)]
pub struct RecordWriter {
    path: PathBuf,
    writer: csv::Writer<File>,
    sync_writes: bool,
}

impl RecordWriter {
    /// Opens `path` for appending, creating it with a header if needed
    ///
    /// A final line left without its terminator by an earlier crash is closed
    /// off first so new records never run into it.
    pub fn open(path: &Path, sync_writes: bool) -> StoreResult<Self> {
        let io_error = |source: std::io::Error| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };

        let needs_newline = ends_without_newline(path).map_err(io_error)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_error)?;
        let is_empty = file.metadata().map_err(io_error)?.len() == 0;

        if needs_newline {
            tracing::warn!(
                "Output store {} ends with an incomplete line; terminating it",
                path.display()
            );
            file.write_all(b"\n").map_err(io_error)?;
            if sync_writes {
                file.sync_data().map_err(io_error)?;
            }
        }

        let mut store = Self {
            path: path.to_path_buf(),
            writer: csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(file),
            sync_writes,
        };

        if is_empty {
            store.write_fields(&HEADER)?;
            tracing::debug!("Created output store {}", path.display());
        }

        Ok(store)
    }

    /// Appends one record and makes it durable
    pub fn append(&mut self, record: &ScanRecord) -> StoreResult<()> {
        self.write_fields(&record.to_fields())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_fields<I, T>(&mut self, fields: I) -> StoreResult<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer
            .write_record(fields)
            .map_err(|source| StoreError::Csv {
                path: self.path.clone(),
                source,
            })?;
        self.flush()
    }

    fn flush(&mut self) -> StoreResult<()> {
        let io_error = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        self.writer.flush().map_err(io_error)?;
        if self.sync_writes {
            self.writer.get_ref().sync_data().map_err(io_error)?;
        }
        Ok(())
    }
}

/// True if the file exists, is non-empty and its last byte is not `\n`
fn ends_without_newline(path: &Path) -> std::io::Result<bool> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    if file.metadata()?.len() == 0 {
        return Ok(false);
    }

    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}
