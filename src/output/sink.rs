//! Append-only text sinks
//!
//! Both sinks are shared by many concurrent writers. Each write is a single
//! self-contained unit: a delimited block appended to the corpus file, or a
//! whole file for one archive record.

use crate::output::{OutputError, OutputResult};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Width of the `=` delimiter line closing each page block
const BLOCK_DELIMITER_WIDTH: usize = 80;

/// Destination for text extracted from crawled pages
pub trait TextSink: Send + Sync {
    /// Appends one page's text as a self-delimited block
    fn append_page(&self, url: &str, text: &str) -> OutputResult<()>;
}

/// Destination for accepted archive records
pub trait RecordSink: Send + Sync {
    /// Writes one record keyed by its identifier
    fn write_record(&self, id: &str, text: &str) -> OutputResult<()>;
}

/// Corpus file that receives one block per page
///
/// Every append opens the file, writes the whole block and closes it again
/// while holding a lock, so blocks from concurrent writers never interleave.
#[derive(Debug)]
pub struct AppendTextFile {
    path: PathBuf,
    lock: Mutex<()>,
}

impl AppendTextFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Formats a page block: header line, text, blank line, delimiter
pub(crate) fn format_block(url: &str, text: &str) -> String {
    format!(
        "URL: {}\n{}\n\n{}\n\n",
        url,
        text,
        "=".repeat(BLOCK_DELIMITER_WIDTH)
    )
}

impl TextSink for AppendTextFile {
    fn append_page(&self, url: &str, text: &str) -> OutputResult<()> {
        let block = format_block(url, text);
        let _guard = self.lock.lock().unwrap_or_else(|p| p.into_inner());

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(block.as_bytes())?;
        Ok(())
    }
}

/// Directory holding one `<id>.txt` file per accepted record
#[derive(Debug, Clone)]
pub struct RecordDir {
    dir: PathBuf,
}

impl RecordDir {
    /// Opens the directory, creating it if needed
    pub fn create(dir: impl Into<PathBuf>) -> OutputResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Path of the file a record id maps to
    pub fn record_path(&self, id: &str) -> OutputResult<PathBuf> {
        let name = file_name_for(id);
        if name.is_empty() {
            return Err(OutputError::Write(format!("unusable record id {:?}", id)));
        }
        Ok(self.dir.join(format!("{}.txt", name)))
    }
}

impl RecordSink for RecordDir {
    fn write_record(&self, id: &str, text: &str) -> OutputResult<()> {
        let path = self.record_path(id)?;
        fs::write(path, text)?;
        Ok(())
    }
}

/// Maps a record id onto a single path component
fn file_name_for(id: &str) -> String {
    let name: String = id
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    name.trim_start_matches('.').to_string()
}
