use fabstir_websearch::crawl::{
    CrawlConfig, CrawlEngine, CrawlOutcome, FailureKind, FetchBackend, PayloadFormat,
    ReaderFetcher,
};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

const READER_TEXT: &str = "Title: Reinforcement learning\n\nMarkdown Content:\n# Reinforcement learning\n\nAgents learn from reward.";

fn reader(server: &MockServer, key: Option<&str>) -> ReaderFetcher {
    ReaderFetcher::with_base_url(
        &server.uri(),
        key.map(str::to_string),
        Duration::from_secs(2),
    )
    .unwrap()
}

#[tokio::test]
async fn test_reader_returns_text_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_string(READER_TEXT))
        .expect(1)
        .mount(&server)
        .await;

    let page = reader(&server, Some("test-key"))
        .fetch("https://example.com/rl", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(page.format, PayloadFormat::Text);
    assert_eq!(page.body, READER_TEXT);
}

#[tokio::test]
async fn test_reader_text_skips_extraction_in_engine() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(READER_TEXT))
        .mount(&server)
        .await;

    let engine = CrawlEngine::with_backends(
        CrawlConfig::default(),
        vec![Arc::new(reader(&server, Some("test-key")))],
    );
    let result = engine.crawl("https://example.com/rl", 0, true).await.unwrap();

    assert_eq!(result.outcome(), CrawlOutcome::Success);
    assert_eq!(result.text(), READER_TEXT);
}

#[tokio::test]
async fn test_reader_without_key_is_auth_failure() {
    let server = MockServer::start().await;

    let err = reader(&server, None)
        .fetch("https://example.com/rl", &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::Auth);
    assert!(server.received_requests().await.unwrap_or_default().is_empty());
}

#[tokio::test]
async fn test_reader_rejected_key_is_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = reader(&server, Some("bad-key"))
        .fetch("https://example.com/rl", &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::Auth);
}

#[tokio::test]
async fn test_reader_rate_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "30"))
        .mount(&server)
        .await;

    let err = reader(&server, Some("test-key"))
        .fetch("https://example.com/rl", &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::RateLimited);
}

#[tokio::test]
async fn test_reader_empty_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let err = reader(&server, Some("test-key"))
        .fetch("https://example.com/rl", &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), FailureKind::EmptyPayload);
}
