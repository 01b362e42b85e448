//! Backwards line iteration over the output store
//!
//! A long scan produces a store with billions of lines; resuming only needs
//! the last few, so the file is read from the end in fixed-size chunks.

use std::io::{self, Read, Seek, SeekFrom};

const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// Iterates the lines of a seekable reader from last to first
///
/// Blank lines are skipped and a trailing `\r` is removed from each line.
#[derive(Debug)]
pub struct ReverseLines<R> {
    reader: R,
    /// Offset of the first byte held in `tail`
    position: u64,
    /// Unconsumed bytes between `position` and the last emitted line
    tail: Vec<u8>,
    chunk_size: usize,
}

impl<R: Read + Seek> ReverseLines<R> {
    pub fn new(reader: R) -> io::Result<Self> {
        Self::with_chunk_size(reader, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(mut reader: R, chunk_size: usize) -> io::Result<Self> {
        let position = reader.seek(SeekFrom::End(0))?;
        Ok(Self {
            reader,
            position,
            tail: Vec::new(),
            chunk_size: chunk_size.max(1),
        })
    }

    /// Prepends the previous chunk of the reader to `tail`
    fn read_previous_chunk(&mut self) -> io::Result<()> {
        let size = self.position.min(self.chunk_size as u64);
        self.position -= size;
        self.reader.seek(SeekFrom::Start(self.position))?;

        let mut chunk = vec![0u8; size as usize];
        self.reader.read_exact(&mut chunk)?;
        chunk.extend_from_slice(&self.tail);
        self.tail = chunk;
        Ok(())
    }

    fn next_raw(&mut self) -> io::Result<Option<Vec<u8>>> {
        loop {
            if let Some(newline) = self.tail.iter().rposition(|&b| b == b'\n') {
                let line = self.tail.split_off(newline + 1);
                self.tail.truncate(newline);
                return Ok(Some(line));
            }

            if self.position == 0 {
                if self.tail.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(std::mem::take(&mut self.tail)));
            }

            self.read_previous_chunk()?;
        }
    }
}

impl<R: Read + Seek> Iterator for ReverseLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let mut raw = match self.next_raw() {
                Ok(Some(raw)) => raw,
                Ok(None) => return None,
                Err(e) => return Some(Err(e)),
            };

            if raw.last() == Some(&b'\r') {
                raw.pop();
            }
            if raw.is_empty() {
                continue;
            }

            return Some(
                String::from_utf8(raw).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn lines(content: &str, chunk_size: usize) -> Vec<String> {
        ReverseLines::with_chunk_size(Cursor::new(content.as_bytes().to_vec()), chunk_size)
            .unwrap()
            .collect::<io::Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn test_reverse_order() {
        assert_eq!(lines("a\nb\nc\n", 1024), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_no_trailing_newline() {
        assert_eq!(lines("a\nb\nc", 1024), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_small_chunks_span_lines() {
        let content = "first line\nsecond line\nthird line\n";
        for chunk_size in 1..8 {
            assert_eq!(
                lines(content, chunk_size),
                vec!["third line", "second line", "first line"]
            );
        }
    }

    #[test]
    fn test_crlf_and_blank_lines() {
        assert_eq!(lines("a\r\n\r\nb\r\n\n", 3), vec!["b", "a"]);
    }

    #[test]
    fn test_empty() {
        assert!(lines("", 16).is_empty());
        assert!(lines("\n\n", 16).is_empty());
    }

    #[test]
    fn test_invalid_utf8() {
        let mut reverse =
            ReverseLines::new(Cursor::new(vec![b'o', b'k', b'\n', 0xff, 0xfe])).unwrap();
        assert!(reverse.next().unwrap().is_err());
    }

    #[test]
    fn test_reads_only_tail() {
        let mut content = "x".repeat(10_000);
        content.push_str("\nlast\n");
        let mut reverse =
            ReverseLines::with_chunk_size(Cursor::new(content.into_bytes()), 16).unwrap();

        assert_eq!(reverse.next().unwrap().unwrap(), "last");
        assert!(reverse.position > 9_000);
    }
}
