use async_trait::async_trait;
use fabstir_websearch::cache::{CachePolicy, ResponseCache};
use fabstir_websearch::crawl::{
    CrawlConfig, CrawlEngine, CrawlOutcome, FailureKind, FetchBackend, FetchError, FetchLevel,
    HttpFetcher, PayloadFormat, RawPage,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Backend that returns a fixed text payload and counts its calls
struct CountingBackend {
    name: &'static str,
    body: Option<&'static str>,
    calls: AtomicUsize,
}

impl CountingBackend {
    fn ok(name: &'static str, body: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            body: Some(body),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            body: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FetchBackend for CountingBackend {
    async fn fetch(&self, url: &str, _cancel: &CancellationToken) -> Result<RawPage, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.body {
            Some(body) => Ok(RawPage {
                url: url.to_string(),
                status: 200,
                content_type: Some("text/plain".to_string()),
                format: PayloadFormat::Text,
                body: body.to_string(),
            }),
            None => Err(FetchError::Transport(format!("{} down", self.name))),
        }
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// Backend that only finishes when cancelled, then runs an async teardown
struct TeardownBackend {
    torn_down: AtomicBool,
}

impl TeardownBackend {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            torn_down: AtomicBool::new(false),
        })
    }

    fn torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FetchBackend for TeardownBackend {
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<RawPage, FetchError> {
        cancel.cancelled().await;
        // Stands in for closing a browser or a connection
        tokio::time::sleep(Duration::from_millis(10)).await;
        self.torn_down.store(true, Ordering::SeqCst);
        Err(FetchError::Cancelled(url.to_string()))
    }

    fn name(&self) -> &'static str {
        "teardown"
    }
}

/// Backend that records how many calls run at the same time
struct PeakBackend {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl PeakBackend {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl FetchBackend for PeakBackend {
    async fn fetch(&self, url: &str, _cancel: &CancellationToken) -> Result<RawPage, FetchError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        Ok(RawPage {
            url: url.to_string(),
            status: 200,
            content_type: Some("text/plain".to_string()),
            format: PayloadFormat::Text,
            body: format!("Body text for {}", url),
        })
    }

    fn name(&self) -> &'static str {
        "peak"
    }
}

fn config() -> CrawlConfig {
    CrawlConfig::default()
        .with_private_hosts(true)
        .with_timeout_secs(2)
}

#[tokio::test]
async fn test_blocked_http_falls_back_to_next_level() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/guarded"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Checking your browser"))
        .expect(1)
        .mount(&server)
        .await;

    let second = CountingBackend::ok("second", "Recovered page text from the second level.");
    let third = CountingBackend::ok("third", "never used");
    let http = HttpFetcher::new(config().timeout()).unwrap();
    let engine = CrawlEngine::with_backends(
        config(),
        vec![Arc::new(http), second.clone(), third.clone()],
    );

    let result = engine
        .crawl(&format!("{}/guarded", server.uri()), 2, true)
        .await
        .unwrap();

    assert_eq!(result.outcome(), CrawlOutcome::Degraded);
    assert_eq!(result.level(), Some(FetchLevel(1)));
    assert_eq!(result.text(), "Recovered page text from the second level.");
    assert_eq!(result.failures().len(), 1);
    assert_eq!(result.failures()[0].backend, "http");
    assert_eq!(second.calls(), 1);
    assert_eq!(third.calls(), 0);
}

#[tokio::test]
async fn test_max_level_bounds_the_chain() {
    let first = CountingBackend::failing("first");
    let second = CountingBackend::ok("second", "text");
    let engine = CrawlEngine::with_backends(config(), vec![first.clone(), second.clone()]);

    let result = engine.crawl("https://example.com/a", 0, true).await.unwrap();

    assert_eq!(result.outcome(), CrawlOutcome::Exhausted);
    assert_eq!(first.calls(), 1);
    assert_eq!(second.calls(), 0);
}

#[tokio::test]
async fn test_levels_attempted_in_order() {
    let a = CountingBackend::failing("a");
    let b = CountingBackend::failing("b");
    let c = CountingBackend::failing("c");
    let engine = CrawlEngine::with_backends(config(), vec![a, b, c]);

    let result = engine.crawl("https://example.com/a", 5, true).await.unwrap();

    let levels: Vec<FetchLevel> = result.failures().iter().map(|f| f.level).collect();
    assert_eq!(levels, vec![FetchLevel(0), FetchLevel(1), FetchLevel(2)]);
    assert!(result
        .failures()
        .iter()
        .all(|f| f.error.kind() == FailureKind::Transport));
}

#[tokio::test]
async fn test_register_appends_level() {
    let mut engine = CrawlEngine::with_backends(config(), vec![CountingBackend::failing("a")]);
    let level = engine.register(CountingBackend::ok("b", "from the registered backend"));
    assert_eq!(level, FetchLevel(1));

    let result = engine.crawl("https://example.com/a", 1, true).await.unwrap();
    assert_eq!(result.backend(), Some("b"));
}

#[tokio::test]
async fn test_shared_cache_skips_network() {
    let backend = CountingBackend::ok("only", "cached body text");
    let cache = Arc::new(ResponseCache::new(CachePolicy::default()));
    let engine =
        CrawlEngine::with_backends(config(), vec![backend.clone()]).with_cache(cache.clone());

    let first = engine.crawl("https://example.com/c", 0, true).await.unwrap();
    let second = engine.crawl("https://example.com/c", 0, true).await.unwrap();

    assert!(!first.from_cache());
    assert!(second.from_cache());
    assert_eq!(second.text(), "cached body text");
    assert_eq!(backend.calls(), 1);
    assert_eq!(cache.stats().total, 1);

    // Raw and extracted text are cached separately
    engine.crawl("https://example.com/c", 0, false).await.unwrap();
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn test_cancelled_before_start() {
    let backend = CountingBackend::ok("only", "text");
    let engine = CrawlEngine::with_backends(config(), vec![backend]);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result = engine
        .crawl_with_cancel("https://example.com/a", 0, true, &cancel)
        .await
        .unwrap();
    assert!(result.was_cancelled());
    assert_eq!(result.outcome(), CrawlOutcome::Exhausted);
}

#[tokio::test]
async fn test_cached_fallback_keeps_its_level() {
    let first = CountingBackend::failing("first");
    let second = CountingBackend::ok("second", "level one text");
    let cache = Arc::new(ResponseCache::new(CachePolicy::default()));
    let engine = CrawlEngine::with_backends(config(), vec![first.clone(), second.clone()])
        .with_cache(cache);

    let fetched = engine.crawl("https://example.com/d", 1, true).await.unwrap();
    assert_eq!(fetched.outcome(), CrawlOutcome::Degraded);
    assert_eq!(fetched.level(), Some(FetchLevel(1)));

    let hit = engine.crawl("https://example.com/d", 1, true).await.unwrap();
    assert!(hit.from_cache());
    assert_eq!(hit.outcome(), CrawlOutcome::Degraded);
    assert_eq!(hit.level(), Some(FetchLevel(1)));
    assert_eq!(hit.backend(), Some("second"));
    assert_eq!(second.calls(), 1);

    // Text cached from level 1 is not served to a level 0 request
    let bounded = engine.crawl("https://example.com/d", 0, true).await.unwrap();
    assert!(!bounded.from_cache());
    assert_eq!(bounded.outcome(), CrawlOutcome::Exhausted);
    assert!(bounded.text().is_empty());
    assert_eq!(first.calls(), 2);
    assert_eq!(second.calls(), 1);
}

#[tokio::test]
async fn test_cancelled_backend_runs_its_teardown() {
    let backend = TeardownBackend::new();
    let engine = CrawlEngine::with_backends(config(), vec![backend.clone()]);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let result = engine
        .crawl_with_cancel("https://example.com/a", 0, true, &cancel)
        .await
        .unwrap();

    assert!(result.was_cancelled());
    assert_eq!(result.outcome(), CrawlOutcome::Exhausted);
    assert!(backend.torn_down());
}

#[tokio::test]
async fn test_timed_out_backend_runs_its_teardown() {
    let backend = TeardownBackend::new();
    let next = CountingBackend::ok("next", "text from the next level");
    let engine = CrawlEngine::with_backends(
        config().with_timeout_secs(1),
        vec![backend.clone(), next.clone()],
    );

    let result = engine.crawl("https://example.com/a", 1, true).await.unwrap();

    assert!(backend.torn_down());
    assert_eq!(result.failures()[0].error.kind(), FailureKind::Timeout);
    assert_eq!(result.level(), Some(FetchLevel(1)));
    assert_eq!(next.calls(), 1);
}

#[tokio::test]
async fn test_crawl_many_respects_concurrency() {
    let backend = PeakBackend::new();
    let engine =
        CrawlEngine::with_backends(config().with_concurrency(2), vec![backend.clone()]);
    let urls: Vec<String> = (0..8)
        .map(|i| format!("https://example.com/page/{}", i))
        .collect();

    let results = engine
        .crawl_many(&urls, 0, true, &CancellationToken::new())
        .await;

    assert_eq!(results.len(), 8);
    assert!(results.iter().all(|r| r.as_ref().unwrap().is_success()));
    let peak = backend.peak.load(Ordering::SeqCst);
    assert!(peak <= 2, "peak in-flight crawls was {}", peak);
    assert_eq!(peak, 2);
}

#[cfg(not(feature = "browser"))]
#[tokio::test]
async fn test_unavailable_browser_level_is_recorded() {
    use fabstir_websearch::crawl::BrowserFetcher;

    let reader = CountingBackend::ok("reader", "reader text");
    let engine = CrawlEngine::with_backends(
        config(),
        vec![
            CountingBackend::failing("http"),
            Arc::new(BrowserFetcher::new()),
            reader.clone(),
        ],
    );

    assert_eq!(engine.available_backends(), vec!["http", "reader"]);

    let result = engine.crawl("https://example.com/a", 2, true).await.unwrap();
    assert_eq!(result.level(), Some(FetchLevel::READER));
    assert_eq!(result.failures()[1].error.kind(), FailureKind::Unavailable);
    assert_eq!(reader.calls(), 1);
}
