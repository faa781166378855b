//! Integration tests for the discovery lifecycle: load site list, probe, save.
//!
//! Each test stands up its own wiremock server and its own temp directory.
//! Requests that match no mock get wiremock's default empty 404.

use feedprobe::config::Config;
use feedprobe::feed::{build_client, BatchCoordinator, SiteResolver};
use feedprobe::storage::{load_sites, save_sites, Site, NO_FEED_SENTINEL};
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const FEED_BODY: &str = r#"<?xml version="1.0"?>
<feed xmlns="http://www.w3.org/2005/Atom"><title>Example</title></feed>"#;

fn test_config() -> Config {
    Config {
        probe_timeout_secs: 5,
        ..Config::default()
    }
}

fn coordinator(config: &Config) -> BatchCoordinator {
    let client = build_client(config).unwrap();
    BatchCoordinator::new(
        SiteResolver::from_config(client, config),
        config.site_concurrency,
    )
}

fn exact_path(expected: &'static str) -> impl Fn(&Request) -> bool + Send + Sync + 'static {
    move |req: &Request| req.url.path() == expected && req.url.query().is_none()
}

fn temp_sites_file(name: &str, content: &str) -> (PathBuf, PathBuf) {
    let dir = std::env::temp_dir().join(format!("feedprobe_lifecycle_{name}"));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("sites.json");
    std::fs::write(&path, content).unwrap();
    (dir, path)
}

async fn feed_at_path(feed_path: &'static str) -> MockServer {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(exact_path(feed_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED_BODY))
        .mount(&mock_server)
        .await;
    mock_server
}

// ============================================================================
// End-to-end file scenarios
// ============================================================================

#[tokio::test]
async fn test_feed_found_is_written_back() {
    let mock_server = feed_at_path("/feed/").await;
    let input = format!(r#"[{{"url":"{}"}}]"#, mock_server.uri());
    let (dir, path) = temp_sites_file("found", &input);

    let mut sites = load_sites(&path).await.unwrap();
    let report = coordinator(&test_config()).run(&mut sites).await;
    save_sites(&path, &sites).await.unwrap();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(
        written,
        serde_json::json!([{
            "url": mock_server.uri(),
            "rss": format!("{}/feed/", mock_server.uri()),
        }])
    );
    assert_eq!(report.found, 1);
    assert_eq!(report.not_found, 0);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_no_feed_writes_sentinel() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    let input = format!(r#"[{{"url":"{}"}}]"#, mock_server.uri());
    let (dir, path) = temp_sites_file("sentinel", &input);

    let mut sites = load_sites(&path).await.unwrap();
    let report = coordinator(&test_config()).run(&mut sites).await;
    save_sites(&path, &sites).await.unwrap();

    let reloaded = load_sites(&path).await.unwrap();
    assert_eq!(reloaded[0].feed.as_deref(), Some(NO_FEED_SENTINEL));
    assert_eq!(report.not_found, 1);

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_saved_file_is_pretty_printed() {
    let input = r#"[{"url":"https://example.com","rss":"https://example.com/rss"}]"#;
    let (dir, path) = temp_sites_file("pretty", input);

    let sites = load_sites(&path).await.unwrap();
    save_sites(&path, &sites).await.unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        written,
        concat!(
            "[\n",
            "  {\n",
            "    \"url\": \"https://example.com\",\n",
            "    \"rss\": \"https://example.com/rss\"\n",
            "  }\n",
            "]\n"
        )
    );

    // No temp files left behind
    let leftovers: Vec<_> = std::fs::read_dir(&dir)
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name() != "sites.json")
        .collect();
    assert!(leftovers.is_empty());

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_load_errors() {
    let missing = std::env::temp_dir().join("feedprobe_lifecycle_missing/sites.json");
    let err = load_sites(&missing).await.unwrap_err();
    assert!(err.to_string().contains("Error reading JSON file"));

    let (dir, path) = temp_sites_file("bad_json", "[{\"url\": ");
    let err = load_sites(&path).await.unwrap_err();
    assert!(err.to_string().contains("Error parsing JSON file"));

    std::fs::remove_dir_all(&dir).ok();
}

// ============================================================================
// Batch invariants
// ============================================================================

#[tokio::test]
async fn test_rerun_skips_known_feeds() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED_BODY))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut known = Site::new(mock_server.uri());
    known.feed = Some("https://elsewhere.example.com/feed.xml".to_string());
    let mut sites = vec![known.clone()];

    let report = coordinator(&test_config()).run(&mut sites).await;

    assert_eq!(sites, vec![known]);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.attempted, 0);
}

#[tokio::test]
async fn test_sentinel_sites_are_probed_again() {
    let mock_server = feed_at_path("/rss.xml").await;

    let mut retry = Site::new(mock_server.uri());
    retry.feed = Some(NO_FEED_SENTINEL.to_string());
    let mut sites = vec![retry];

    coordinator(&test_config()).run(&mut sites).await;

    assert_eq!(sites[0].feed, Some(format!("{}/rss.xml", mock_server.uri())));
}

#[tokio::test]
async fn test_every_probed_site_ends_with_url_or_sentinel() {
    let with_feed = feed_at_path("/atom.xml").await;
    let without_feed = MockServer::start().await;

    let mut sites = vec![
        Site::new(with_feed.uri()),
        Site::new(without_feed.uri()),
        Site::new("definitely not a url"),
    ];

    let report = coordinator(&test_config()).run(&mut sites).await;

    for site in &sites {
        let feed = site.feed.as_deref().expect("probed site must have a feed value");
        assert!(
            feed == NO_FEED_SENTINEL || url::Url::parse(feed).is_ok(),
            "unexpected feed value {feed:?}"
        );
    }
    assert_eq!(sites[0].feed, Some(format!("{}/atom.xml", with_feed.uri())));
    assert_eq!(sites[1].feed.as_deref(), Some(NO_FEED_SENTINEL));
    assert_eq!(sites[2].feed.as_deref(), Some(NO_FEED_SENTINEL));
    assert_eq!(report.found, 1);
    assert_eq!(report.not_found, 2);
}

#[tokio::test]
async fn test_site_concurrency_cap() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_delay(Duration::from_millis(20)))
        .mount(&mock_server)
        .await;

    let config = Config {
        site_concurrency: 3,
        ..test_config()
    };
    let client = build_client(&config).unwrap();
    let resolver = SiteResolver::from_config(client, &config).with_candidates(["rss", "atom"]);

    // Distinct base paths so every site is its own resolution
    let mut sites: Vec<Site> = (0..12)
        .map(|i| Site::new(format!("{}/site{i}", mock_server.uri())))
        .collect();

    let report = BatchCoordinator::new(resolver, config.site_concurrency)
        .run(&mut sites)
        .await;

    assert_eq!(report.attempted, 12);
    assert!(report.peak_in_flight <= 3, "peak {}", report.peak_in_flight);
    assert!(report.peak_in_flight >= 2, "sites never overlapped");
}

#[tokio::test]
async fn test_early_hits_do_not_exceed_total_request_cap() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(|req: &Request| req.url.path().ends_with("/hit"))
        .respond_with(ResponseTemplate::new(200).set_body_string(FEED_BODY))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_delay(Duration::from_secs(3)))
        .mount(&mock_server)
        .await;

    let config = Config {
        site_concurrency: 3,
        probe_concurrency: 2,
        ..test_config()
    };
    let client = build_client(&config).unwrap();
    let candidates =
        std::iter::once("hit".to_string()).chain((0..10).map(|i| format!("slow{i}")));
    let resolver = SiteResolver::from_config(client, &config).with_candidates(candidates);
    let coordinator = BatchCoordinator::new(resolver, config.site_concurrency);

    let mut sites: Vec<Site> = (0..12)
        .map(|i| Site::new(format!("{}/site{i}", mock_server.uri())))
        .collect();

    // Every site finds its feed at once; its slow siblings keep running
    let batch = tokio::spawn(async move { coordinator.run(&mut sites).await });
    tokio::time::sleep(Duration::from_millis(300)).await;

    let slow_requests = mock_server
        .received_requests()
        .await
        .unwrap()
        .iter()
        .filter(|req| !req.url.path().ends_with("/hit"))
        .count();
    batch.abort();

    // None of the 3s responses has completed yet, so every one is still in flight
    assert!(slow_requests >= 2, "sites never started probing");
    assert!(
        slow_requests <= config.site_concurrency * config.probe_concurrency,
        "{slow_requests} requests in flight, cap is {}",
        config.site_concurrency * config.probe_concurrency
    );
}
