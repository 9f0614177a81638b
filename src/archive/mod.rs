//! Archived web snapshot access
//!
//! This module provides:
//! - Streaming decoding of gzip-compressed WET segments into text records
//! - Segment sources (archive host over HTTP, or a local mirror)
//! - Locator lists and archive index lookups

pub mod index;
mod source;
mod wet;

pub use index::{
    fetch_crawl_ids, fetch_index_urls, fetch_segment_paths, write_locators,
    DEFAULT_ARCHIVE_BASE_URL, DEFAULT_COLLINFO_URL, DEFAULT_INDEX_BASE_URL,
};
pub use source::{
    parse_locators, read_locators, HttpSegmentSource, LocalSegmentSource, SegmentError,
    SegmentSource,
};
pub use wet::{DecodeError, Record, WarcReader};

#[cfg(test)]
pub(crate) use wet::tests::{gzip_members, warc_record};
