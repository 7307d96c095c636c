use fabstir_websearch::crawl::{
    CrawlConfig, CrawlEngine, CrawlOutcome, FailureKind, FetchBackend, FetchLevel, HttpFetcher,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ARTICLE: &str = r#"<html><head><title>RL</title><script>var x = 1;</script></head>
<body>
  <nav><a href="/">Home</a> | <a href="/about">About</a></nav>
  <article>
    <h1>Reinforcement learning</h1>
    <p>Reinforcement learning trains an agent to act in an environment by maximising cumulative reward over many interactions.</p>
    <p>Policies map observations to actions and are improved from experience collected while exploring the environment.</p>
    <ul><li>Value-based methods</li><li>Policy-gradient methods</li></ul>
  </article>
  <footer>Copyright 2025</footer>
</body></html>"#;

fn local_config() -> CrawlConfig {
    CrawlConfig::default()
        .with_private_hosts(true)
        .with_timeout_secs(1)
}

fn http_engine(config: CrawlConfig) -> CrawlEngine {
    let http = HttpFetcher::new(config.timeout()).unwrap();
    CrawlEngine::with_backends(config, vec![Arc::new(http)])
}

async fn serve(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_http_backend_extracts_article() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/article",
        ResponseTemplate::new(200).set_body_raw(ARTICLE, "text/html; charset=utf-8"),
    )
    .await;

    let engine = http_engine(local_config());
    let result = engine
        .crawl(&format!("{}/article", server.uri()), 0, true)
        .await
        .unwrap();

    assert_eq!(result.outcome(), CrawlOutcome::Success);
    assert_eq!(result.level(), Some(FetchLevel::HTTP));
    assert_eq!(result.backend(), Some("http"));
    assert!(result.text().contains("# Reinforcement learning"));
    assert!(result.text().contains("maximising cumulative reward"));
    assert!(result.text().contains("- Value-based methods"));
    assert!(!result.text().contains("About"));
    assert!(!result.text().contains("Copyright"));
    assert!(!result.text().contains("var x"));
}

#[tokio::test]
async fn test_html_labelled_as_plain_text_is_still_extracted() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/mislabelled",
        ResponseTemplate::new(200).set_body_raw(ARTICLE, "text/plain; charset=utf-8"),
    )
    .await;

    let engine = http_engine(local_config());
    let result = engine
        .crawl(&format!("{}/mislabelled", server.uri()), 0, true)
        .await
        .unwrap();

    assert_eq!(result.outcome(), CrawlOutcome::Success);
    assert!(result.text().contains("maximising cumulative reward"));
    assert!(!result.text().contains("<article>"));
    assert!(!result.text().contains("var x"));
}

#[tokio::test]
async fn test_plain_text_page_passes_through() {
    let notes = "Release notes\n\nVersion 2 adds a faster scheduler and fixes the memory leak in the worker pool.";
    let server = MockServer::start().await;
    serve(
        &server,
        "/notes.txt",
        ResponseTemplate::new(200).set_body_raw(notes, "text/plain"),
    )
    .await;

    let engine = http_engine(local_config());
    let result = engine
        .crawl(&format!("{}/notes.txt", server.uri()), 0, true)
        .await
        .unwrap();

    assert_eq!(result.outcome(), CrawlOutcome::Success);
    assert_eq!(result.text(), notes);
}

#[tokio::test]
async fn test_raw_mode_returns_markup() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/article",
        ResponseTemplate::new(200).set_body_raw(ARTICLE, "text/html"),
    )
    .await;

    let engine = http_engine(local_config());
    let result = engine
        .crawl(&format!("{}/article", server.uri()), 0, false)
        .await
        .unwrap();

    assert!(result.is_success());
    assert!(result.text().contains("<article>"));
}

#[tokio::test]
async fn test_server_error_is_exhausted_not_empty_success() {
    let server = MockServer::start().await;
    serve(&server, "/broken", ResponseTemplate::new(500)).await;

    let engine = http_engine(local_config());
    let result = engine
        .crawl(&format!("{}/broken", server.uri()), 0, true)
        .await
        .unwrap();

    assert_eq!(result.outcome(), CrawlOutcome::Exhausted);
    assert!(!result.is_success());
    assert!(result.text().is_empty());
    assert!(!result.fetched_but_empty());
    assert_eq!(result.failures().len(), 1);
    assert_eq!(result.failures()[0].error.kind(), FailureKind::HttpStatus);
}

#[tokio::test]
async fn test_rate_limited_status() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/busy",
        ResponseTemplate::new(429).insert_header("retry-after", "7"),
    )
    .await;

    let http = HttpFetcher::new(Duration::from_secs(1)).unwrap();
    let err = http
        .fetch(&format!("{}/busy", server.uri()), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::RateLimited);
}

#[tokio::test]
async fn test_tiny_payload_is_bad_content() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/tiny",
        ResponseTemplate::new(200).set_body_raw("<html><body>hi</body></html>", "text/html"),
    )
    .await;

    let http = HttpFetcher::new(Duration::from_secs(1)).unwrap();
    let err = http
        .fetch(&format!("{}/tiny", server.uri()), &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), FailureKind::BadContent);
}

#[tokio::test]
async fn test_slow_page_times_out() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/slow",
        ResponseTemplate::new(200)
            .set_body_raw(ARTICLE, "text/html")
            .set_delay(Duration::from_secs(3)),
    )
    .await;

    let engine = http_engine(local_config());
    let result = engine
        .crawl(&format!("{}/slow", server.uri()), 0, true)
        .await
        .unwrap();

    assert_eq!(result.outcome(), CrawlOutcome::Exhausted);
    assert_eq!(result.failures()[0].error.kind(), FailureKind::Timeout);
}

#[tokio::test]
async fn test_loopback_rejected_by_default() {
    let server = MockServer::start().await;
    let engine = http_engine(CrawlConfig::default());
    assert!(engine
        .crawl(&format!("{}/article", server.uri()), 0, true)
        .await
        .is_err());
}

#[tokio::test]
async fn test_crawl_many_keeps_input_order() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/article",
        ResponseTemplate::new(200).set_body_raw(ARTICLE, "text/html"),
    )
    .await;
    serve(&server, "/missing", ResponseTemplate::new(404)).await;

    let engine = http_engine(local_config().with_concurrency(2));
    let urls = vec![
        format!("{}/missing", server.uri()),
        format!("{}/article", server.uri()),
        "not a url".to_string(),
    ];

    let results = engine
        .crawl_many(&urls, 0, true, &CancellationToken::new())
        .await;

    assert_eq!(results.len(), 3);
    assert!(!results[0].as_ref().unwrap().is_success());
    assert!(results[1].as_ref().unwrap().is_success());
    assert!(results[2].is_err());
}
