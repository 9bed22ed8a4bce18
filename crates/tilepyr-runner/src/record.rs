//! Newline-delimited JSON tile records.
//!
//! Each line is one JSON object carrying the tile address and a base64 image:
//!
//! ```text
//! {"z": 3, "x": 2, "y": 3, "image": "iVBORw0KGgo..."}
//! ```
//!
//! `zoom`, `column` and `row` are accepted as aliases. Lines are read one at a
//! time, so memory use does not grow with the input.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use std::io::BufRead;
use thiserror::Error;

/// One decoded tile record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRecord {
    pub zoom: i64,
    pub column: i64,
    pub row: i64,
    /// Raw image bytes, stored verbatim.
    pub image: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(alias = "zoom")]
    z: i64,
    #[serde(alias = "column")]
    x: i64,
    #[serde(alias = "row")]
    y: i64,
    image: String,
}

/// Errors produced while reading records.
#[derive(Debug, Error)]
pub enum RecordError {
    /// Line is not a JSON object with the expected fields.
    #[error("line {line}: invalid record: {source}")]
    Json {
        line: u64,
        #[source]
        source: serde_json::Error,
    },

    /// The `image` field is not valid base64.
    #[error("line {line}: invalid base64 image: {source}")]
    Base64 {
        line: u64,
        #[source]
        source: base64::DecodeError,
    },

    /// Line is not valid UTF-8.
    #[error("line {line}: not valid UTF-8")]
    Encoding { line: u64 },

    /// The underlying reader failed.
    #[error("line {line}: read failed: {source}")]
    Io {
        line: u64,
        #[source]
        source: std::io::Error,
    },
}

impl RecordError {
    /// Line number (1-based) the error refers to.
    pub fn line(&self) -> u64 {
        match self {
            RecordError::Json { line, .. }
            | RecordError::Base64 { line, .. }
            | RecordError::Encoding { line }
            | RecordError::Io { line, .. } => *line,
        }
    }

    /// Whether the pipeline may skip this record and carry on.
    ///
    /// Malformed lines are recoverable; a failing reader is not.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, RecordError::Io { .. })
    }
}

/// Parse one NDJSON line.
pub fn parse_line(line: &str, line_no: u64) -> Result<TileRecord, RecordError> {
    let raw: RawRecord = serde_json::from_str(line).map_err(|source| RecordError::Json {
        line: line_no,
        source,
    })?;
    let image = STANDARD
        .decode(raw.image.trim())
        .map_err(|source| RecordError::Base64 {
            line: line_no,
            source,
        })?;
    Ok(TileRecord {
        zoom: raw.z,
        column: raw.x,
        row: raw.y,
        image,
    })
}

/// Lazily reads [`TileRecord`]s from a buffered reader, one line per record.
///
/// Blank lines are ignored. Malformed lines are yielded as recoverable errors
/// so the caller can count and skip them.
#[derive(Debug)]
pub struct NdjsonRecords<R> {
    reader: R,
    line: u64,
    buf: Vec<u8>,
    failed: bool,
}

impl<R: BufRead> NdjsonRecords<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: Vec::new(),
            failed: false,
        }
    }

    /// Number of lines consumed so far.
    pub fn lines_read(&self) -> u64 {
        self.line
    }
}

impl<R: BufRead> Iterator for NdjsonRecords<R> {
    type Item = Result<TileRecord, RecordError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            self.buf.clear();
            let read = match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(read) => read,
                Err(source) => {
                    // A broken reader would fail forever; stop after reporting it once.
                    self.failed = true;
                    return Some(Err(RecordError::Io {
                        line: self.line + 1,
                        source,
                    }));
                }
            };
            if read == 0 {
                return None;
            }
            self.line += 1;

            let text = match std::str::from_utf8(&self.buf) {
                Ok(text) => text.trim(),
                Err(_) => return Some(Err(RecordError::Encoding { line: self.line })),
            };
            if text.is_empty() {
                continue;
            }
            return Some(parse_line(text, self.line));
        }
    }
}
