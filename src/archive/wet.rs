//! Streaming WET segment decoding
//!
//! A segment is a gzip stream made of many concatenated members, each
//! holding one WARC record: a `WARC/1.0` version line, `Name: value` header
//! lines, a blank line, then exactly `Content-Length` bytes of payload.
//! [`WarcReader`] walks those records lazily and yields only the
//! `conversion` ones (extracted plain text).

use flate2::read::MultiGzDecoder;
use std::collections::HashMap;
use std::io::{BufRead, BufReader, Cursor, Read};
use thiserror::Error;

/// Record kind carrying extracted plain text
const CONVERSION_TYPE: &str = "conversion";

/// Largest payload accepted for a single record
const MAX_RECORD_LENGTH: u64 = 256 * 1024 * 1024;

/// Errors raised while decoding a segment
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Failed to decompress segment: {0}")]
    Decompress(#[from] std::io::Error),

    #[error("Malformed archive record: {0}")]
    Malformed(String),
}

/// One extracted-text record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Stable identifier used to name the output
    pub id: String,

    /// Payload decoded as UTF-8 (invalid sequences replaced)
    pub text: String,
}

/// Lazy, forward-only reader over the records of one segment
///
/// The iterator stops after the first error; a segment cannot be resumed
/// past a decoding failure.
pub struct WarcReader<R> {
    reader: R,
    line: Vec<u8>,
    finished: bool,
}

impl WarcReader<BufReader<MultiGzDecoder<Cursor<Vec<u8>>>>> {
    /// Reads records out of a gzip-compressed segment held in memory
    pub fn from_gzip(bytes: Vec<u8>) -> Self {
        Self::new(BufReader::new(MultiGzDecoder::new(Cursor::new(bytes))))
    }
}

impl<R: BufRead> WarcReader<R> {
    /// Reads records out of an already decompressed stream
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
            finished: false,
        }
    }

    /// Reads one line, returning `None` at end of stream
    fn read_line(&mut self) -> Result<Option<String>, DecodeError> {
        self.line.clear();
        let read = self.reader.read_until(b'\n', &mut self.line)?;
        if read == 0 {
            return Ok(None);
        }
        let line = String::from_utf8_lossy(&self.line);
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Reads the next raw record of any type
    fn next_raw(&mut self) -> Result<Option<(HashMap<String, String>, Vec<u8>)>, DecodeError> {
        // Skip the blank lines separating records
        let version = loop {
            match self.read_line()? {
                None => return Ok(None),
                Some(line) if line.trim().is_empty() => continue,
                Some(line) => break line,
            }
        };

        if !version.starts_with("WARC/") {
            return Err(DecodeError::Malformed(format!(
                "expected WARC version line, found {:?}",
                truncate(&version, 40)
            )));
        }

        let mut headers = HashMap::new();
        loop {
            let Some(line) = self.read_line()? else {
                return Err(DecodeError::Malformed(
                    "stream ended inside record headers".to_string(),
                ));
            };
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
            }
        }

        let length: u64 = headers
            .get("content-length")
            .ok_or_else(|| DecodeError::Malformed("missing Content-Length".to_string()))?
            .parse()
            .map_err(|_| DecodeError::Malformed("invalid Content-Length".to_string()))?;

        if length > MAX_RECORD_LENGTH {
            return Err(DecodeError::Malformed(format!(
                "Content-Length {} exceeds the {} byte limit",
                length, MAX_RECORD_LENGTH
            )));
        }

        // The buffer grows with the bytes actually present
        let mut payload = Vec::new();
        let read = (&mut self.reader).take(length).read_to_end(&mut payload)?;
        if read as u64 != length {
            return Err(DecodeError::Malformed(format!(
                "record payload is truncated ({} of {} bytes)",
                read, length
            )));
        }

        Ok(Some((headers, payload)))
    }

    fn next_conversion(&mut self) -> Result<Option<Record>, DecodeError> {
        while let Some((headers, payload)) = self.next_raw()? {
            let kind = headers.get("warc-type").map(String::as_str);
            if kind != Some(CONVERSION_TYPE) {
                continue;
            }

            let id = record_id(&headers).ok_or_else(|| {
                DecodeError::Malformed("conversion record without an identifier".to_string())
            })?;

            return Ok(Some(Record {
                id,
                text: String::from_utf8_lossy(&payload).into_owned(),
            }));
        }
        Ok(None)
    }
}

impl<R: BufRead> Iterator for WarcReader<R> {
    type Item = Result<Record, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.next_conversion() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

/// Picks the record identifier: the trec id if present, else the record id
/// without its angle brackets
fn record_id(headers: &HashMap<String, String>) -> Option<String> {
    if let Some(trec) = headers.get("warc-trec-id").filter(|v| !v.is_empty()) {
        return Some(trec.clone());
    }

    headers
        .get("warc-record-id")
        .map(|v| v.trim_start_matches('<').trim_end_matches('>').to_string())
        .filter(|v| !v.is_empty())
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
