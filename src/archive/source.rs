//! Segment sources and locator lists
//!
//! A locator is the relative path of one segment, as listed (one per line)
//! in a `wet.paths` file. A [`SegmentSource`] turns a locator into the
//! segment's compressed bytes.

use crate::config::{ClassifierConfig, FetchConfig, UserAgentConfig};
use crate::crawler::build_http_client;
use async_trait::async_trait;
use flate2::read::MultiGzDecoder;
use reqwest::Client;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Failure to obtain a segment
#[derive(Debug, Error)]
pub enum SegmentError {
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Download of {url} failed: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Provides the compressed bytes of a segment
#[async_trait]
pub trait SegmentSource: Send + Sync {
    async fn fetch_segment(&self, locator: &str) -> Result<Vec<u8>, SegmentError>;
}

/// Downloads segments from an archive host
pub struct HttpSegmentSource {
    client: Client,
    base_url: String,
}

impl HttpSegmentSource {
    /// `base_url` is prefixed verbatim to every locator
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Creates a source for the configured archive host
    ///
    /// Whole downloads are bounded by `segment_timeout`, not by the crawl's
    /// per-page timeout; only the connect timeout is shared.
    pub fn from_config(
        classifier: &ClassifierConfig,
        fetch: &FetchConfig,
        user_agent: &UserAgentConfig,
    ) -> Result<Self, reqwest::Error> {
        let client = build_http_client(
            user_agent,
            Duration::from_secs(classifier.segment_timeout),
            Duration::from_secs(fetch.connect_timeout),
        )?;
        Ok(Self::new(client, classifier.archive_base_url.as_str()))
    }

    pub fn segment_url(&self, locator: &str) -> String {
        format!("{}{}", self.base_url, locator.trim())
    }
}

#[async_trait]
impl SegmentSource for HttpSegmentSource {
    async fn fetch_segment(&self, locator: &str) -> Result<Vec<u8>, SegmentError> {
        let url = self.segment_url(locator);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| SegmentError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(SegmentError::Status { url, status });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| SegmentError::Transport {
                url: url.clone(),
                source,
            })?;
        Ok(bytes.to_vec())
    }
}

/// Reads segments from a local mirror of the archive layout
pub struct LocalSegmentSource {
    root: PathBuf,
}

impl LocalSegmentSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl SegmentSource for LocalSegmentSource {
    async fn fetch_segment(&self, locator: &str) -> Result<Vec<u8>, SegmentError> {
        let path = self.root.join(locator.trim().trim_start_matches('/'));
        tokio::fs::read(&path)
            .await
            .map_err(|source| SegmentError::Io {
                path: path.display().to_string(),
                source,
            })
    }
}

/// Reads segment locators, one per line, from a plain or `.gz` file
///
/// Lines are trimmed and blank lines are skipped.
pub fn read_locators(path: &Path) -> std::io::Result<Vec<String>> {
    let file = File::open(path)?;
    let gzipped = path.extension().is_some_and(|ext| ext == "gz");

    let reader: Box<dyn BufRead> = if gzipped {
        Box::new(BufReader::new(MultiGzDecoder::new(file)))
    } else {
        Box::new(BufReader::new(file))
    };

    parse_locators(reader)
}

/// Splits a locator list into trimmed, non-empty lines
pub fn parse_locators<R: BufRead>(reader: R) -> std::io::Result<Vec<String>> {
    let mut locators = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let line = line.trim();
        if !line.is_empty() {
            locators.push(line.to_string());
        }
    }
    Ok(locators)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_read_plain_locators() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("wet.paths");
        std::fs::write(&file, "crawl-data/a.warc.wet.gz\n\n  crawl-data/b.warc.wet.gz  \n").unwrap();

        let locators = read_locators(&file).unwrap();
        assert_eq!(
            locators,
            vec!["crawl-data/a.warc.wet.gz", "crawl-data/b.warc.wet.gz"]
        );
    }

    #[test]
    fn test_read_gzip_locators() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("wet.paths.gz");
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(b"one\ntwo\n").unwrap();
        std::fs::write(&file, encoder.finish().unwrap()).unwrap();

        assert_eq!(read_locators(&file).unwrap(), vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_http_source_downloads_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/crawl-data/seg-1.warc.wet.gz"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
            .mount(&server)
            .await;

        let source = HttpSegmentSource::new(Client::new(), format!("{}/", server.uri()));
        let bytes = source
            .fetch_segment("crawl-data/seg-1.warc.wet.gz")
            .await
            .unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_slow_segment_outlives_page_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/crawl-data/slow.warc.wet.gz"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(vec![7u8; 16])
                    .set_delay(Duration::from_millis(1500)),
            )
            .mount(&server)
            .await;

        let fetch = FetchConfig {
            fetch_timeout: 1,
            ..FetchConfig::default()
        };
        let classifier = ClassifierConfig {
            model_path: "lid.176.ftz".to_string(),
            target_label: "__label__mn".to_string(),
            threshold: 0.8,
            worker_count: 1,
            archive_base_url: format!("{}/", server.uri()),
            paths_file: "wet.paths".to_string(),
            segment_timeout: 10,
        };

        let source =
            HttpSegmentSource::from_config(&classifier, &fetch, &UserAgentConfig::default())
                .unwrap();
        let bytes = source
            .fetch_segment("crawl-data/slow.warc.wet.gz")
            .await
            .unwrap();
        assert_eq!(bytes.len(), 16);
    }

    #[tokio::test]
    async fn test_http_source_non_200_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let source = HttpSegmentSource::new(Client::new(), format!("{}/", server.uri()));
        let err = source.fetch_segment("missing.gz").await.unwrap_err();
        assert!(matches!(err, SegmentError::Status { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_local_source() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("crawl-data")).unwrap();
        std::fs::write(dir.path().join("crawl-data/x.gz"), b"abc").unwrap();

        let source = LocalSegmentSource::new(dir.path());
        assert_eq!(source.fetch_segment("crawl-data/x.gz").await.unwrap(), b"abc");
        assert!(matches!(
            source.fetch_segment("crawl-data/missing.gz").await,
            Err(SegmentError::Io { .. })
        ));
    }
}
