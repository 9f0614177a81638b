//! Archive index helpers
//!
//! Lists the crawls published by the archive, downloads the segment path
//! list of one crawl, and queries a crawl's URL index.

use crate::archive::source::parse_locators;
use crate::{HarvestError, Result, UrlError};
use flate2::read::MultiGzDecoder;
use reqwest::Client;
use serde::Deserialize;
use std::io::{BufReader, Write};
use std::path::Path;
use url::Url;

/// Collection listing of the public archive index
pub const DEFAULT_COLLINFO_URL: &str = "https://index.commoncrawl.org/collinfo.json";

/// Host serving crawl data; segment locators are relative to it
pub const DEFAULT_ARCHIVE_BASE_URL: &str = "https://data.commoncrawl.org/";

/// Host serving the per-crawl URL indexes
pub const DEFAULT_INDEX_BASE_URL: &str = "https://index.commoncrawl.org";

#[derive(Debug, Deserialize)]
struct CollectionInfo {
    id: String,
}

#[derive(Debug, Deserialize)]
struct IndexEntry {
    url: String,
}

async fn get_bytes(client: &Client, url: &str) -> Result<Vec<u8>> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| HarvestError::Http {
            url: url.to_string(),
            source,
        })?;

    let status = response.status().as_u16();
    if status != 200 {
        return Err(HarvestError::Status {
            url: url.to_string(),
            status,
        });
    }

    let bytes = response.bytes().await.map_err(|source| HarvestError::Http {
        url: url.to_string(),
        source,
    })?;
    Ok(bytes.to_vec())
}

/// Fetches the ids of all published crawls, newest first as listed
pub async fn fetch_crawl_ids(client: &Client, collinfo_url: &str) -> Result<Vec<String>> {
    let body = get_bytes(client, collinfo_url).await?;
    let collections: Vec<CollectionInfo> = serde_json::from_slice(&body)?;
    Ok(collections.into_iter().map(|c| c.id).collect())
}

/// URL of the gzip-compressed WET path list of a crawl
pub fn wet_paths_url(base_url: &str, crawl_id: &str) -> String {
    format!("{}crawl-data/{}/wet.paths.gz", base_url, crawl_id)
}

/// Downloads and decompresses the WET segment locators of a crawl
pub async fn fetch_segment_paths(
    client: &Client,
    base_url: &str,
    crawl_id: &str,
) -> Result<Vec<String>> {
    let url = wet_paths_url(base_url, crawl_id);
    let body = get_bytes(client, &url).await?;

    let locators = parse_locators(BufReader::new(MultiGzDecoder::new(body.as_slice())))
        .map_err(crate::archive::DecodeError::Decompress)?;

    tracing::info!("{} lists {} segments", crawl_id, locators.len());
    Ok(locators)
}

/// Lists the captured URLs of a crawl matching `url_pattern` (e.g. `*.mn`)
///
/// The index answers 404 when nothing matches, which yields an empty list.
/// Lines that are not index entries are skipped.
pub async fn fetch_index_urls(
    client: &Client,
    index_base: &str,
    crawl_id: &str,
    url_pattern: &str,
) -> Result<Vec<String>> {
    let endpoint = format!("{}/{}-index", index_base.trim_end_matches('/'), crawl_id);
    let mut url = Url::parse(&endpoint).map_err(|e| UrlError::Parse(e.to_string()))?;
    url.query_pairs_mut()
        .append_pair("url", url_pattern)
        .append_pair("output", "json");

    let body = match get_bytes(client, url.as_str()).await {
        Ok(body) => body,
        Err(HarvestError::Status { status: 404, .. }) => {
            tracing::info!("{} has no captures for {}", crawl_id, url_pattern);
            return Ok(Vec::new());
        }
        Err(e) => return Err(e),
    };

    let mut urls = Vec::new();
    for line in String::from_utf8_lossy(&body).lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<IndexEntry>(line) {
            Ok(entry) => urls.push(entry.url),
            Err(e) => tracing::warn!("Skipping index line ({}): {}", e, line),
        }
    }

    tracing::info!("{} lists {} URLs for {}", crawl_id, urls.len(), url_pattern);
    Ok(urls)
}

/// Writes locators one per line, replacing any existing file
pub fn write_locators(path: &Path, locators: &[String]) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    for locator in locators {
        writeln!(file, "{}", locator)?;
    }
    file.flush()?;
    Ok(())
}
