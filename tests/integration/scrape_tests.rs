//! Integration tests for the scrape engine
//!
//! These tests use wiremock to stand in for the auction-listing site and
//! exercise the full orchestrator cycle end-to-end: fetch, parse, retry,
//! skip-cache persistence, and cross-server aggregation.

use market_miner::client::{HttpSourceClient, SourceClient};
use market_miner::config::{
    Config, MultiServerMode, OutputConfig, ScrapeConfig, ServerEntry, SourceConfig,
};
use market_miner::model::{SkipEntry, SkipReason};
use market_miner::output::EventSink;
use market_miner::scrape::{RateLimiter, ScrapeEvent, ScrapeOrchestrator};
use market_miner::storage::{JsonSkipStore, MemorySkipStore, SkipStore};
use market_miner::RunStatus;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Sink that records every event for later assertions
#[derive(Default)]
struct CollectingSink {
    events: Mutex<Vec<ScrapeEvent>>,
}

impl CollectingSink {
    fn events(&self) -> Vec<ScrapeEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl EventSink for CollectingSink {
    fn on_event(&self, event: &ScrapeEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Creates a test configuration pointing at the mock server
fn create_test_config(base_url: &str, from_id: u32, to_id: u32, skip_path: &str) -> Config {
    Config {
        scrape: ScrapeConfig {
            server: "Asura".to_string(),
            from_id,
            to_id,
            thread_count: 2,
            rate_limit_per_sec: 500.0,
            retry_ceiling: 2,
            backoff_base_ms: 1,
            backoff_cap_ms: 4,
            failure_threshold: 100,
            multi_server_mode: MultiServerMode::Sequential,
        },
        source: SourceConfig {
            base_url: base_url.to_string(),
            timeout_secs: 5,
            user_agent: "TestAgent/1.0".to_string(),
        },
        output: OutputConfig {
            items_path: "./items.csv".to_string(),
            cross_server_path: "./cross_server_items.csv".to_string(),
            skip_cache_path: skip_path.to_string(),
        },
        servers: vec![
            ServerEntry {
                name: "Asura".to_string(),
                sid: 28,
            },
            ServerEntry {
                name: "Bahamut".to_string(),
                sid: 1,
            },
        ],
    }
}

/// Minimal item page the parser accepts
fn item_html(name: &str, median_price: u32, extra: &str) -> String {
    format!(
        r#"<html><body>
        <a href="/browse/0/">Root</a>
        <a href="/browse/49/">Crystals</a>
        <span class="item-name">{name}</span>
        {extra}
        <table><tr><td>Median</td><td><span>{median_price}</span></td></tr></table>
        </body></html>"#
    )
}

async fn mock_item(server: &MockServer, item_id: u32, body: String) {
    Mock::given(method("POST"))
        .and(path(format!("/item/{}", item_id)))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn build_orchestrator(
    config: Config,
    store: Arc<dyn SkipStore>,
    sink: Arc<CollectingSink>,
) -> ScrapeOrchestrator {
    let client = HttpSourceClient::new(&config.source).expect("client");
    ScrapeOrchestrator::new(config, Arc::new(client), store, sink)
}

#[tokio::test]
async fn test_full_run_partitions_range() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let skip_path = dir.path().join("skips.json");

    // 1, 2, 5: normal items. 3: nonexistent (404). 4: Exclusive. 6: always 500.
    mock_item(&mock_server, 1, item_html("Fire Crystal", 100, "")).await;
    mock_item(&mock_server, 2, item_html("Ice Crystal", 150, "")).await;
    Mock::given(method("POST"))
        .and(path("/item/3"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    mock_item(
        &mock_server,
        4,
        item_html("Excalibur", 0, r#"<span class="ex">Ex</span>"#),
    )
    .await;
    mock_item(&mock_server, 5, item_html("Wind Crystal", 120, "")).await;
    Mock::given(method("POST"))
        .and(path("/item/6"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), 1, 6, skip_path.to_str().unwrap());
    let sink = Arc::new(CollectingSink::default());
    let orchestrator = build_orchestrator(config, Arc::new(JsonSkipStore::new(&skip_path)), Arc::clone(&sink));

    let outcome = orchestrator.run().await.expect("run");

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.per_server.len(), 1);
    let records = &outcome.per_server[0].records;
    assert_eq!(records.len(), 3);
    assert_eq!(records[&1].name, "Fire Crystal");
    assert_eq!(records[&1].price, Some(100));
    assert_eq!(records[&1].category, "Crystals");

    // Every ID in the range appears in exactly one terminal event.
    let mut seen = std::collections::HashSet::new();
    let mut skipped = 0;
    let mut failed = 0;
    for event in sink.events() {
        match event {
            ScrapeEvent::Record { record, .. } => {
                assert!(seen.insert(record.item_id));
            }
            ScrapeEvent::Skipped { item_id, .. } => {
                assert!(seen.insert(item_id));
                skipped += 1;
            }
            ScrapeEvent::Failed { item_id, .. } => {
                assert!(seen.insert(item_id));
                failed += 1;
            }
            ScrapeEvent::Progress(_) => {}
        }
    }
    assert_eq!(seen, (1..=6).collect());
    assert_eq!(skipped, 2);
    assert_eq!(failed, 1);

    // Definitive outcomes were persisted; the transient failure was not.
    let store = JsonSkipStore::new(&skip_path);
    let entries = store.load().unwrap();
    let ids: Vec<u32> = entries.iter().map(|e| e.item_id).collect();
    assert_eq!(ids, vec![3, 4]);
    let exclusive = entries.iter().find(|e| e.item_id == 4).unwrap();
    assert_eq!(exclusive.name, "Excalibur");
    assert_eq!(exclusive.reason, "not sellable");
}

#[tokio::test]
async fn test_warm_skip_cache_issues_no_requests() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let skip_path = dir.path().join("skips.json");

    // Every ID in the range is already known skippable.
    let store = JsonSkipStore::new(&skip_path);
    let entries: Vec<SkipEntry> = (1..=5)
        .map(|id| SkipEntry::new(id, "Unknown", SkipReason::Nonexistent))
        .collect();
    store.save(&entries).unwrap();

    // Any request at all fails the test.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(item_html("Ghost", 1, "")))
        .expect(0)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), 1, 5, skip_path.to_str().unwrap());
    let sink = Arc::new(CollectingSink::default());
    let orchestrator = build_orchestrator(config, Arc::new(store), Arc::clone(&sink));

    let outcome = orchestrator.run().await.expect("run");

    assert_eq!(outcome.status, RunStatus::Completed);
    assert!(outcome.per_server[0].records.is_empty());
    let skipped = sink
        .events()
        .iter()
        .filter(|e| matches!(e, ScrapeEvent::Skipped { .. }))
        .count();
    assert_eq!(skipped, 5);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let skip_path = dir.path().join("skips.json");

    // Two 500s, then the real page; a retry ceiling of 3 must succeed.
    Mock::given(method("POST"))
        .and(path("/item/1"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;
    mock_item(&mock_server, 1, item_html("Fire Crystal", 100, "")).await;

    let mut config = create_test_config(&mock_server.uri(), 1, 1, skip_path.to_str().unwrap());
    config.scrape.retry_ceiling = 3;
    let sink = Arc::new(CollectingSink::default());
    let orchestrator = build_orchestrator(config, Arc::new(JsonSkipStore::new(&skip_path)), Arc::clone(&sink));

    let outcome = orchestrator.run().await.expect("run");

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.per_server[0].records[&1].price, Some(100));
    assert!(sink
        .events()
        .iter()
        .any(|e| matches!(e, ScrapeEvent::Record { .. })));

    // No skip entry for an item that merely needed retries.
    assert!(JsonSkipStore::new(&skip_path).load().unwrap().is_empty());
}

#[tokio::test]
async fn test_server_selection_posts_sid() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let skip_path = dir.path().join("skips.json");

    Mock::given(method("POST"))
        .and(path("/item/1"))
        .and(body_string_contains("sid=28"))
        .respond_with(ResponseTemplate::new(200).set_body_string(item_html("Fire Crystal", 100, "")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), 1, 1, skip_path.to_str().unwrap());
    let sink = Arc::new(CollectingSink::default());
    let orchestrator = build_orchestrator(config, Arc::new(JsonSkipStore::new(&skip_path)), sink);

    let outcome = orchestrator.run().await.expect("run");
    assert_eq!(outcome.per_server[0].records.len(), 1);
}

#[tokio::test]
async fn test_cross_server_aggregation() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let skip_path = dir.path().join("skips.json");

    // Same item, different price per server (selected by the sid form field).
    Mock::given(method("POST"))
        .and(path("/item/1"))
        .and(body_string_contains("sid=28"))
        .respond_with(ResponseTemplate::new(200).set_body_string(item_html("Fire Crystal", 100, "")))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/item/1"))
        .and(body_string_contains("sid=1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(item_html("Fire Crystal", 80, "")))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), 1, 1, skip_path.to_str().unwrap());
    config.scrape.server = "all".to_string();
    let sink = Arc::new(CollectingSink::default());
    let orchestrator = build_orchestrator(config, Arc::new(JsonSkipStore::new(&skip_path)), sink);

    let outcome = orchestrator.run().await.expect("run");

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.per_server.len(), 2);
    assert_eq!(outcome.cross_server.len(), 1);

    let row = &outcome.cross_server[0];
    assert_eq!(row.item_id, 1);
    assert_eq!(row.lowest_price, 80);
    assert_eq!(row.lowest_server, "Bahamut");
    assert_eq!(row.highest_price, 100);
    assert_eq!(row.highest_server, "Asura");
    assert_eq!(row.average_price, 90);
    assert_eq!(row.price_spread, 20);
    assert_eq!(row.server_count, 2);
}

#[tokio::test]
async fn test_unreachable_source_aborts_run() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let skip_path = dir.path().join("skips.json");

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), 1, 50, skip_path.to_str().unwrap());
    config.scrape.retry_ceiling = 1;
    config.scrape.failure_threshold = 3;
    let sink = Arc::new(CollectingSink::default());
    let orchestrator = build_orchestrator(config, Arc::new(JsonSkipStore::new(&skip_path)), sink);

    let outcome = orchestrator.run().await.expect("run");

    assert_eq!(outcome.status, RunStatus::Failed);
    assert!(outcome.per_server[0].records.is_empty());
    // A failed run never poisons the skip-cache.
    assert!(JsonSkipStore::new(&skip_path).load().unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_server_selection_is_an_error() {
    let dir = TempDir::new().unwrap();
    let skip_path = dir.path().join("skips.json");

    let mut config = create_test_config("http://127.0.0.1:9", 1, 1, skip_path.to_str().unwrap());
    config.scrape.server = "Atlantis".to_string();
    let sink = Arc::new(CollectingSink::default());
    let orchestrator = build_orchestrator(config, Arc::new(JsonSkipStore::new(&skip_path)), sink);

    assert!(orchestrator.run().await.is_err());
}

#[tokio::test]
async fn test_stack_variant_is_fetched() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let skip_path = dir.path().join("skips.json");

    let single = item_html(
        "Fire Crystal",
        100,
        r#"<a href="/item/1?stack=1">Stack</a>"#,
    );
    mock_item(&mock_server, 1, single).await;
    Mock::given(method("GET"))
        .and(path("/item/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(item_html("Fire Crystal x12", 1100, "")))
        .mount(&mock_server)
        .await;

    let config = create_test_config(&mock_server.uri(), 1, 1, skip_path.to_str().unwrap());
    let sink = Arc::new(CollectingSink::default());
    let orchestrator = build_orchestrator(config, Arc::new(JsonSkipStore::new(&skip_path)), sink);

    let outcome = orchestrator.run().await.expect("run");
    let record = &outcome.per_server[0].records[&1];

    assert_eq!(record.price, Some(100));
    assert_eq!(record.stack_size, 12);
    assert_eq!(record.stack_price, Some(1100));
}

#[tokio::test]
async fn test_concurrent_mode_runs_all_servers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/item/1"))
        .and(body_string_contains("sid=28"))
        .respond_with(ResponseTemplate::new(200).set_body_string(item_html("Fire Crystal", 100, "")))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/item/1"))
        .and(body_string_contains("sid=1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(item_html("Fire Crystal", 80, "")))
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), 1, 1, "./unused-skips.json");
    config.scrape.server = "all".to_string();
    config.scrape.multi_server_mode = MultiServerMode::Concurrent;
    let sink = Arc::new(CollectingSink::default());
    let orchestrator = build_orchestrator(config, Arc::new(MemorySkipStore::new()), sink);

    let outcome = orchestrator.run().await.expect("run");

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.per_server.len(), 2);
    for result in &outcome.per_server {
        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.records.len(), 1);
    }

    assert_eq!(outcome.cross_server.len(), 1);
    let row = &outcome.cross_server[0];
    assert_eq!(row.lowest_price, 80);
    assert_eq!(row.lowest_server, "Bahamut");
    assert_eq!(row.highest_price, 100);
    assert_eq!(row.highest_server, "Asura");
    assert_eq!(row.server_count, 2);
}

#[tokio::test]
async fn test_concurrent_cancellation_stops_every_run() {
    let mock_server = MockServer::start().await;

    // Slow responses keep both pools busy long enough to observe the stop.
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(item_html("Slow Crystal", 50, ""))
                .set_delay(Duration::from_millis(20)),
        )
        .mount(&mock_server)
        .await;

    let mut config = create_test_config(&mock_server.uri(), 1, 100, "./unused-skips.json");
    config.scrape.server = "all".to_string();
    config.scrape.multi_server_mode = MultiServerMode::Concurrent;
    let sink = Arc::new(CollectingSink::default());
    let orchestrator = build_orchestrator(config, Arc::new(MemorySkipStore::new()), sink);
    let cancel = orchestrator.cancel_handle();

    let run = tokio::spawn(async move { orchestrator.run().await });
    tokio::time::sleep(Duration::from_millis(60)).await;
    cancel.cancel();
    let outcome = run.await.unwrap().expect("run");

    assert_eq!(outcome.status, RunStatus::Cancelled);
    assert_eq!(outcome.per_server.len(), 2);
    for result in &outcome.per_server {
        assert_eq!(result.status, RunStatus::Cancelled);
        assert!(result.records.len() < 100, "expected a strict subset");
    }
}

#[tokio::test]
async fn test_stack_fetch_takes_its_own_rate_slot() {
    let mock_server = MockServer::start().await;

    mock_item(
        &mock_server,
        1,
        item_html("Fire Crystal", 100, r#"<a href="/item/1?stack=1">Stack</a>"#),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/item/1"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(item_html("Fire Crystal x12", 1100, "")),
        )
        .mount(&mock_server)
        .await;

    let source = SourceConfig {
        base_url: mock_server.uri(),
        timeout_secs: 5,
        user_agent: "TestAgent/1.0".to_string(),
    };
    let limiter = Arc::new(RateLimiter::new(40.0));
    let client = HttpSourceClient::new(&source)
        .expect("client")
        .with_limiter(Arc::clone(&limiter));

    // Take the grant the worker holds for the item fetch itself.
    limiter.acquire().await;
    let started = std::time::Instant::now();
    let server = ServerEntry {
        name: "Asura".to_string(),
        sid: 28,
    };
    let record = client.fetch_item(1, &server).await.expect("fetch");

    assert_eq!(record.stack_size, 12);
    assert_eq!(record.stack_price, Some(1100));
    // The stack GET waited for the next 25ms limiter slot.
    assert!(started.elapsed() >= Duration::from_millis(20));
}
