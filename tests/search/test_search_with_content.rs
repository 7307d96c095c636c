use fabstir_websearch::compress::CompressConfig;
use fabstir_websearch::crawl::{CrawlConfig, CrawlEngine, HttpFetcher};
use fabstir_websearch::search::{
    ContentStatus, DuckDuckGoProvider, SearchConfig, SearchProvider, SearchService,
};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ARTICLE: &str = r#"<html><body>
  <nav>Home | Topics | Contact</nav>
  <article>
    <h1>Reinforcement learning</h1>
    <p>Reinforcement learning trains an agent to act in an environment by maximising cumulative reward over many interactions.</p>
    <p>Unrelated paragraph about gardening tools, soil preparation and the best season for planting tomatoes outdoors.</p>
  </article>
</body></html>"#;

const CHROME_ONLY: &str = r#"<html><body>
  <nav>Home About Contact Products Services Blog Careers</nav>
  <footer>Copyright 2025 Example Corporation. All rights reserved.</footer>
</body></html>"#;

async fn mount_site(server: &MockServer) {
    let base = server.uri();
    let listing = format!(
        r#"<div class="result"><a class="result__a" href="{base}/article">RL article</a></div>
           <div class="result"><a class="result__a" href="{base}/broken">Broken page</a></div>
           <div class="result"><a class="result__a" href="{base}/chrome">Chrome only</a></div>"#
    );

    Mock::given(method("POST"))
        .and(path("/html/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(ARTICLE, "text/html"),
        )
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/chrome"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(CHROME_ONLY, "text/html"),
        )
        .mount(server)
        .await;
}

fn service(server: &MockServer) -> SearchService {
    let crawl_config = CrawlConfig::default()
        .with_private_hosts(true)
        .with_timeout_secs(2)
        .with_max_level(0);
    let http = HttpFetcher::new(crawl_config.timeout()).unwrap();
    let crawler = CrawlEngine::with_backends(crawl_config, vec![Arc::new(http)]);

    let ddg = DuckDuckGoProvider::with_endpoint(format!("{}/html/", server.uri())).unwrap();
    let providers: Vec<Box<dyn SearchProvider>> = vec![Box::new(ddg)];

    SearchService::with_providers(SearchConfig::default(), providers, Arc::new(crawler))
        .unwrap()
        .with_compressor(CompressConfig::default().with_max_chars(150))
        .unwrap()
}

#[tokio::test]
async fn test_each_result_gets_a_content_status() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let response = service(&server)
        .search_with_content("reinforcement learning", Some(3))
        .await
        .unwrap();

    assert_eq!(response.provider, "duckduckgo");
    assert_eq!(response.result_count, 3);
    assert_eq!(response.content_fetched_count, 1);

    let article = &response.results[0];
    assert_eq!(article.result.rank, 1);
    assert_eq!(article.status, ContentStatus::Compressed);
    assert_eq!(article.crawl_level, Some(0));
    let content = article.content.as_deref().unwrap();
    assert!(content.chars().count() <= 150);
    assert!(content.to_lowercase().contains("reinforcement"));
    assert!(!content.contains("gardening"));

    assert_eq!(response.results[1].status, ContentStatus::NotFetched);
    assert!(response.results[1].content.is_none());

    assert_eq!(response.results[2].status, ContentStatus::Empty);
    assert!(response.results[2].content.is_none());
}

#[tokio::test]
async fn test_response_serializes_statuses() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let response = service(&server)
        .search_with_content("reinforcement learning", Some(3))
        .await
        .unwrap();
    let json = serde_json::to_value(&response).unwrap();

    assert_eq!(json["results"][0]["status"], "compressed");
    assert_eq!(json["results"][1]["status"], "not_fetched");
    assert_eq!(json["results"][2]["status"], "empty");
    assert_eq!(json["contentFetchedCount"], 1);
}
