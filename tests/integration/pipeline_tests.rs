//! Integration tests for the archive classification pipeline
//!
//! Segments are built in the tests as gzip-compressed WET files and served
//! either from a temporary directory or from a wiremock server.

use corpus_harvester::archive::HttpSegmentSource;
use corpus_harvester::classify::{
    run_classification, AcceptCriteria, ClassificationPipeline, ModelLoader,
};
use corpus_harvester::config::{ClassifierConfig, Config};
use corpus_harvester::output::RecordDir;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Two labels: Mongolian Cyrillic trigrams against English ones
const MODEL: &str = r#"{
    "ngram": 3,
    "unknown-log-prob": -10.0,
    "labels": {
        "__label__mn": { " са": -1.0, "сай": -1.0, "айн": -1.0, "йн ": -1.0, "н м": -1.0, " мо": -1.0, "мон": -1.0, "онг": -1.0, "нго": -1.0, "гол": -1.0, "ол ": -1.0 },
        "__label__en": { " he": -1.0, "hel": -1.0, "ell": -1.0, "llo": -1.0, "lo ": -1.0, "o t": -1.0, " th": -1.0, "the": -1.0, "he ": -1.0 }
    }
}"#;

const MONGOLIAN: &str = "Сайн монгол";
const ENGLISH: &str = "hello the";

/// Builds one gzip member per record, the way WET segments are stored
fn wet_segment(records: &[(String, &str)]) -> Vec<u8> {
    let mut warcinfo = GzEncoder::new(Vec::new(), Compression::fast());
    warcinfo
        .write_all(b"WARC/1.0\r\nWARC-Type: warcinfo\r\nContent-Length: 4\r\n\r\ninfo\r\n\r\n")
        .unwrap();
    let mut out = warcinfo.finish().unwrap();

    for (id, text) in records {
        let record = format!(
            "WARC/1.0\r\nWARC-Type: conversion\r\nWARC-Record-ID: <{}>\r\nContent-Length: {}\r\n\r\n{}\r\n\r\n",
            id,
            text.len(),
            text
        );
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(record.as_bytes()).unwrap();
        out.extend(encoder.finish().unwrap());
    }
    out
}

/// Mongolian records first, then English ones
fn mixed_records(prefix: &str, mongolian: usize, english: usize) -> Vec<(String, &'static str)> {
    (0..mongolian)
        .map(|i| (format!("urn:{}:mn-{}", prefix, i), MONGOLIAN))
        .chain((0..english).map(|i| (format!("urn:{}:en-{}", prefix, i), ENGLISH)))
        .collect()
}

fn create_test_config(dir: &Path, locators: &[&str]) -> Config {
    let model_path = dir.join("model.json");
    std::fs::write(&model_path, MODEL).unwrap();

    let paths_file = dir.join("wet.paths");
    std::fs::write(&paths_file, locators.join("\n")).unwrap();

    let mut config = Config::default();
    config.classifier = Some(ClassifierConfig {
        model_path: model_path.display().to_string(),
        target_label: "__label__mn".to_string(),
        threshold: 0.8,
        worker_count: 2,
        archive_base_url: "http://unused.invalid/".to_string(),
        paths_file: paths_file.display().to_string(),
        segment_timeout: 60,
    });
    config.output.records_dir = dir.join("records").display().to_string();
    config
}

fn write_segment(root: &Path, locator: &str, bytes: &[u8]) {
    let file = root.join(locator);
    std::fs::create_dir_all(file.parent().unwrap()).unwrap();
    std::fs::write(file, bytes).unwrap();
}

fn stored_records(dir: &str) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn test_only_target_language_records_are_written() {
    let dir = TempDir::new().unwrap();
    let mirror = dir.path().join("mirror");
    write_segment(
        &mirror,
        "crawl-data/seg-0.warc.wet.gz",
        &wet_segment(&mixed_records("a", 3, 7)),
    );

    let config = create_test_config(dir.path(), &["crawl-data/seg-0.warc.wet.gz"]);

    let summary = run_classification(&config, Some(mirror), CancellationToken::new())
        .await
        .expect("Classification failed");

    assert_eq!(summary.segments_total, 1);
    assert_eq!(summary.segments_processed, 1);
    assert_eq!(summary.records_accepted, 3);
    assert_eq!(summary.records_rejected, 7);
    assert_eq!(summary.workers_started, 1);

    let records = stored_records(&config.output.records_dir);
    assert_eq!(
        records,
        vec!["urn:a:mn-0.txt", "urn:a:mn-1.txt", "urn:a:mn-2.txt"]
    );

    let text = std::fs::read_to_string(
        Path::new(&config.output.records_dir).join("urn:a:mn-0.txt"),
    )
    .unwrap();
    assert_eq!(text, MONGOLIAN);
}

#[tokio::test]
async fn test_corrupt_segment_does_not_stop_the_next() {
    let dir = TempDir::new().unwrap();
    let mirror = dir.path().join("mirror");
    write_segment(&mirror, "seg-1.wet.gz", b"this is not gzip data");
    write_segment(&mirror, "seg-2.wet.gz", &wet_segment(&mixed_records("b", 2, 1)));

    let config = create_test_config(dir.path(), &["seg-1.wet.gz", "seg-2.wet.gz"]);

    let summary = run_classification(&config, Some(mirror), CancellationToken::new())
        .await
        .expect("Classification failed");

    assert_eq!(summary.segments_total, 2);
    assert_eq!(summary.segments_skipped, 1);
    assert_eq!(summary.segments_processed, 1);
    assert_eq!(summary.records_accepted, 2);
    assert_eq!(summary.records_rejected, 1);
    assert_eq!(summary.segments_unprocessed, 0);

    assert_eq!(
        stored_records(&config.output.records_dir),
        vec!["urn:b:mn-0.txt", "urn:b:mn-1.txt"]
    );
}

#[tokio::test]
async fn test_segments_downloaded_over_http() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/crawl-data/seg-0.wet.gz"))
        .respond_with(
            ResponseTemplate::new(200).set_body_bytes(wet_segment(&mixed_records("c", 1, 1))),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/crawl-data/seg-1.wet.gz"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let model_path = dir.path().join("model.json");
    std::fs::write(&model_path, MODEL).unwrap();
    let records_dir = dir.path().join("records");

    let pipeline = ClassificationPipeline::new(
        Arc::new(ModelLoader::new(&model_path)),
        Arc::new(HttpSegmentSource::new(
            reqwest::Client::new(),
            format!("{}/", mock_server.uri()),
        )),
        Arc::new(RecordDir::create(&records_dir).unwrap()),
        AcceptCriteria {
            target_label: "__label__mn".to_string(),
            threshold: 0.8,
        },
    )
    .with_workers(2);

    let summary = pipeline
        .run(vec![
            "crawl-data/seg-0.wet.gz".to_string(),
            "crawl-data/seg-1.wet.gz".to_string(),
        ])
        .await;

    assert_eq!(summary.workers_started, 2);
    assert_eq!(summary.segments_processed, 1);
    assert_eq!(summary.segments_skipped, 1);
    assert_eq!(summary.records_accepted, 1);
    assert_eq!(summary.records_rejected, 1);
    assert!(records_dir.join("urn:c:mn-0.txt").exists());
}

#[tokio::test]
async fn test_missing_model_leaves_segments_unprocessed() {
    let dir = TempDir::new().unwrap();
    let mirror = dir.path().join("mirror");
    write_segment(&mirror, "seg-0.wet.gz", &wet_segment(&mixed_records("d", 1, 0)));

    let mut config = create_test_config(dir.path(), &["seg-0.wet.gz"]);
    if let Some(classifier) = config.classifier.as_mut() {
        classifier.model_path = dir.path().join("absent.json").display().to_string();
    }

    let summary = run_classification(&config, Some(mirror), CancellationToken::new())
        .await
        .expect("Classification failed");

    assert_eq!(summary.workers_failed, summary.workers_started);
    assert_eq!(summary.segments_unprocessed, 1);
    assert_eq!(summary.records_accepted, 0);
    assert!(stored_records(&config.output.records_dir).is_empty());
}

#[tokio::test]
async fn test_missing_classifier_section_is_an_error() {
    let config = Config::default();
    let result = run_classification(&config, None, CancellationToken::new()).await;
    assert!(result.is_err());
}
