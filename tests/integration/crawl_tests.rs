//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end.

use corpus_harvester::config::{Config, UserAgentConfig};
use corpus_harvester::crawler::{build_http_client, crawl, Coordinator, HttpFetcher};
use corpus_harvester::frontier::{Frontier, FrontierLimits, VisitStatus};
use corpus_harvester::output::{write_skip_report, AppendTextFile};
use corpus_harvester::url::DenyPatterns;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration whose files all live in `dir`
fn create_test_config(dir: &Path, seeds: &[String], depth_limit: u32) -> Config {
    let seeds_file = dir.join("domain.csv");
    let rows: Vec<String> = seeds.iter().map(|s| format!("\"{}\"", s)).collect();
    std::fs::write(&seeds_file, rows.join("\n")).expect("Failed to write seeds");

    let mut config = Config::default();
    config.crawler.depth_limit = depth_limit;
    config.crawler.max_concurrent_fetches = 4;
    config.crawler.seeds_file = seeds_file.display().to_string();
    config.fetch.retry_count = 0;
    config.fetch.retry_delay_ms = 10;
    config.user_agent = UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    };
    config.output.text_path = dir.join("corpus.txt").display().to_string();
    config.output.skip_report_path = dir.join("skipped.csv").display().to_string();
    config
}

fn html_page(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(format!("<html><body>{}</body></html>", body))
        .insert_header("content-type", "text/html")
}

fn skip_report_rows(path: &str) -> Vec<String> {
    std::fs::read_to_string(path)
        .expect("Failed to read skip report")
        .lines()
        .skip(1)
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_depth_limit_one_fetches_only_seed() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(&format!(
            r#"<p>Сайн байна уу</p>
            <a href="{0}/news">News</a>
            <a href="/about">About</a>
            <a href="http://external.mn/page">Elsewhere</a>"#,
            base_url
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Would be depth 2
    Mock::given(method("GET"))
        .and(path("/news"))
        .respond_with(html_page("news"))
        .expect(0)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/about"))
        .respond_with(html_page("about"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &[format!("{}/", base_url)], 1);

    let outcome = crawl(&config, CancellationToken::new())
        .await
        .expect("Crawl failed");

    let summary = outcome.report.summary;
    assert_eq!(summary.visited, 1);
    assert_eq!(summary.fetched, 1);
    assert!(!outcome.interrupted);
    assert!(outcome.report.skips.is_empty());

    let corpus = std::fs::read_to_string(&config.output.text_path).unwrap();
    assert!(corpus.starts_with(&format!("URL: {}/\n", base_url)));
    assert!(corpus.contains("Сайн байна уу"));

    assert!(skip_report_rows(&config.output.skip_report_path).is_empty());
}

#[tokio::test]
async fn test_internal_links_followed_external_ignored() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            r#"<p>home</p>
            <a href="/news">News</a>
            <a href="/files/report.pdf">Report</a>
            <a href="http://external.mn/page">Elsewhere</a>"#,
        ))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/news"))
        .respond_with(html_page("<p>news</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/report.pdf"))
        .respond_with(html_page("pdf"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &[format!("{}/", base_url)], 2);

    let outcome = crawl(&config, CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(outcome.report.summary.fetched, 2);
    assert_eq!(outcome.report.summary.visited, 2);

    let corpus = std::fs::read_to_string(&config.output.text_path).unwrap();
    assert!(corpus.contains("news"));
    assert!(!corpus.contains("external.mn"));
}

#[tokio::test]
async fn test_timeout_is_retried_then_reported() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("slow").set_delay(Duration::from_millis(500)))
        .mount(&mock_server)
        .await;

    let client = build_http_client(
        &UserAgentConfig::default(),
        Duration::from_millis(100),
        Duration::from_millis(100),
    )
    .unwrap();
    let executor = Arc::new(HttpFetcher::new(client, 2, Duration::from_millis(10)));

    let dir = TempDir::new().unwrap();
    let text_path = dir.path().join("corpus.txt");
    let frontier = Arc::new(Frontier::new(
        FrontierLimits::default(),
        DenyPatterns::new::<&str>(&[]).unwrap(),
    ));
    let coordinator = Coordinator::new(
        frontier.clone(),
        executor,
        Arc::new(AppendTextFile::new(&text_path)),
        4,
    );

    let seed = format!("{}/", base_url);
    let outcome = coordinator.run(&[seed.clone()]).await;

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);

    let record = frontier.record(&seed).expect("seed not in ledger");
    assert_eq!(record.status, VisitStatus::Failed);
    assert_eq!(record.reason.as_deref(), Some("Timeout"));
    assert_eq!(outcome.report.summary.failed, 1);

    let report_path = dir.path().join("skipped.csv");
    write_skip_report(&report_path, &outcome.report.skips).unwrap();
    let rows = skip_report_rows(report_path.to_str().unwrap());
    assert_eq!(rows, vec![format!("{},Timeout", seed)]);

    assert!(!text_path.exists() || std::fs::read_to_string(&text_path).unwrap().is_empty());
}

#[tokio::test]
async fn test_shared_link_fetched_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            r#"<p>home</p><a href="/left">Left</a><a href="/right">Right</a>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;
    for parent in ["/left", "/right"] {
        Mock::given(method("GET"))
            .and(path(parent))
            .respond_with(html_page(r#"<p>parent</p><a href="/shared#top">Shared</a>"#))
            .expect(1)
            .mount(&mock_server)
            .await;
    }
    Mock::given(method("GET"))
        .and(path("/shared"))
        .respond_with(html_page("<p>shared</p>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &[format!("{}/", mock_server.uri())], 3);

    let outcome = crawl(&config, CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(outcome.report.summary.visited, 4);
    assert_eq!(outcome.report.summary.fetched, 4);

    let corpus = std::fs::read_to_string(&config.output.text_path).unwrap();
    let shared_url = format!("URL: {}/shared\n", mock_server.uri());
    assert_eq!(corpus.matches(&shared_url).count(), 1);
}

#[tokio::test]
async fn test_http_errors_land_in_skip_report() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(r#"<p>home</p><a href="/gone">Gone</a>"#))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &[format!("{}/", mock_server.uri())], 2);

    let outcome = crawl(&config, CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(outcome.report.summary.fetched, 1);
    assert_eq!(outcome.report.summary.skipped, 1);

    let rows = skip_report_rows(&config.output.skip_report_path);
    assert_eq!(rows, vec![format!("{}/gone,HTTP 404", mock_server.uri())]);
}

#[tokio::test]
async fn test_redirect_target_fetched_once() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", format!("{}/home", base_url).as_str()),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/home"))
        .respond_with(html_page(r#"<p>welcome home</p><a href="/home">Home</a>"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let config = create_test_config(dir.path(), &[format!("{}/", base_url)], 3);

    let outcome = crawl(&config, CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert_eq!(outcome.report.summary.fetched, 1);
    assert!(outcome.report.skips.is_empty());

    let corpus = std::fs::read_to_string(&config.output.text_path).unwrap();
    assert_eq!(corpus.matches("welcome home").count(), 1);
}
