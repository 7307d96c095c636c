use fabstir_websearch::search::{
    BraveSearchProvider, ContentFilter, DuckDuckGoProvider, SearchError, SearchProvider,
};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn brave(server: &MockServer) -> BraveSearchProvider {
    BraveSearchProvider::with_endpoint(
        "test-key".to_string(),
        format!("{}/res/v1/web/search", server.uri()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_brave_search_maps_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/res/v1/web/search"))
        .and(header("x-subscription-token", "test-key"))
        .and(query_param("q", "rust async"))
        .and(query_param("count", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "web": {
                "results": [
                    {"title": "Tokio", "url": "https://tokio.rs", "description": "Async runtime", "age": "1 day ago"},
                    {"title": "Async book", "url": "https://rust-lang.github.io/async-book/", "description": "Guide"}
                ]
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let results = brave(&server).search("rust async", 2).await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].title, "Tokio");
    assert_eq!(results[0].rank, 1);
    assert_eq!(results[0].published_date.as_deref(), Some("1 day ago"));
    assert_eq!(results[1].rank, 2);
    assert_eq!(results[1].source, "brave");
}

#[tokio::test]
async fn test_brave_rejected_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = brave(&server).search("q", 5).await.unwrap_err();
    assert!(matches!(err, SearchError::NoApiKey { .. }));
}

#[tokio::test]
async fn test_brave_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "12"))
        .mount(&server)
        .await;

    let err = brave(&server).search("q", 5).await.unwrap_err();
    assert!(matches!(
        err,
        SearchError::RateLimited {
            retry_after_secs: 12
        }
    ));
}

#[tokio::test]
async fn test_brave_malformed_json() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = brave(&server).search("q", 5).await.unwrap_err();
    assert!(matches!(err, SearchError::ParseError { .. }));
}

#[tokio::test]
async fn test_duckduckgo_posts_form_and_parses() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/html/"))
        .and(body_string_contains("q=rust"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<div class="result">
                 <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.rust-lang.org%2F&amp;rut=1">Rust Programming Language</a>
                 <a class="result__snippet">A language empowering everyone.</a>
               </div>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let provider = DuckDuckGoProvider::with_endpoint(format!("{}/html/", server.uri())).unwrap();
    let results = provider.search("rust", 5).await.unwrap();

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].url, "https://www.rust-lang.org/");
    assert_eq!(results[0].snippet, "A language empowering everyone.");
}

#[tokio::test]
async fn test_duckduckgo_throttled() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let provider = DuckDuckGoProvider::with_endpoint(server.uri()).unwrap();
    assert!(matches!(
        provider.search("rust", 5).await,
        Err(SearchError::RateLimited { .. })
    ));
}

#[tokio::test]
async fn test_filter_applied_to_provider_output() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "web": {
                "results": [
                    {"title": "Shop", "url": "https://www.taobao.com/x", "description": "buy"},
                    {"title": "在线观看 高清", "url": "https://video.example.com", "description": ""},
                    {"title": "Docs", "url": "https://docs.rs", "description": "Rust docs"},
                    {"title": "Docs again", "url": "https://docs.rs", "description": "dup"}
                ]
            }
        })))
        .mount(&server)
        .await;

    let raw = brave(&server).search("q", 10).await.unwrap();
    let filter = ContentFilter::new(
        vec!["www.taobao.com".to_string()],
        Some("高清视频|在线观看|实时回复|精选笔记|淘宝"),
    )
    .unwrap();
    let kept = filter.filter_results(raw, 10);

    assert_eq!(kept.len(), 1);
    assert_eq!(kept[0].title, "Docs");
    assert_eq!(kept[0].rank, 1);
}
