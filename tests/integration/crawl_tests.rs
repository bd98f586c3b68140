//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full fetch, parse and collect cycle end-to-end.

use imgscrape::config::{Config, CrawlerConfig, FailurePolicy, HttpConfig};
use imgscrape::context::{Context, ContextError};
use imgscrape::crawler::{build_http_client, crawl, Crawler};
use imgscrape::{CrawlError, FetchError, ImgscrapeError};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a crawler with the given failure policy and a small worker pool
fn create_test_crawler(failure_policy: FailurePolicy) -> Crawler {
    let http = HttpConfig {
        timeout_secs: 60,
        ..HttpConfig::default()
    };
    let client = build_http_client(&http).expect("Failed to build HTTP client");

    Crawler::new(
        client,
        CrawlerConfig {
            max_concurrent_fetches: 4,
            failure_policy,
        },
    )
}

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.to_string(), "text/html")
}

async fn mount_page(server: &MockServer, route: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(html(body))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_images_collected_per_seed_in_order() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/gallery",
        r#"<html><body>
            <img src="/a.png">
            <div><section><p><img src="nested/b.jpg" alt="deep"></p></section></div>
            <img alt="no source">
            <img src="https://cdn.example.com/c.gif">
        </body></html>"#,
    )
    .await;
    mount_page(&mock_server, "/empty", "<html><body><p>nothing here</p></body></html>").await;
    mount_page(&mock_server, "/single", r#"<img src="only.webp">"#).await;

    let mut crawler = create_test_crawler(FailurePolicy::FailFast);
    crawler
        .register([
            format!("{}/gallery", base_url),
            format!("{}/empty", base_url),
            format!("{}/single", base_url),
        ])
        .expect("Failed to register seeds");

    let results = crawler
        .run(&Context::background())
        .await
        .expect("Crawl failed");

    assert_eq!(results.len(), 3);
    assert_eq!(
        results[0],
        vec!["/a.png", "nested/b.jpg", "https://cdn.example.com/c.gif"]
    );
    assert!(results[1].is_empty());
    assert_eq!(results[2], vec!["only.webp"]);
}

#[tokio::test]
async fn test_duplicate_seeds_each_fetched() {
    let mock_server = MockServer::start().await;
    let seed = format!("{}/page", mock_server.uri());

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(html(r#"<img src="x.png"><img src="x.png">"#))
        .expect(2)
        .mount(&mock_server)
        .await;

    let mut crawler = create_test_crawler(FailurePolicy::FailFast);
    crawler.register([&seed, &seed]).expect("Failed to register seeds");

    let results = crawler.run(&Context::background()).await.expect("Crawl failed");

    // Duplicates within a page and across seeds are both kept
    assert_eq!(results, vec![vec!["x.png", "x.png"], vec!["x.png", "x.png"]]);
}

#[tokio::test]
async fn test_fail_fast_reports_failing_index() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // The healthy page may be aborted before it is requested, so no expectation on it
    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(html(r#"<img src="fine.png">"#))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let mut crawler = create_test_crawler(FailurePolicy::FailFast);
    crawler
        .register([format!("{}/ok", base_url), format!("{}/broken", base_url)])
        .expect("Failed to register seeds");

    let err = crawler.run(&Context::background()).await.unwrap_err();

    match err {
        CrawlError::Fetch { index, source } => {
            assert_eq!(index, 1);
            assert!(matches!(source, FetchError::Status { status: 500, .. }));
            assert!(source.url().ends_with("/broken"));
        }
        other => panic!("expected fetch error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fail_fast_does_not_wait_for_slow_pages() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(html("<img src=\"late.png\">").set_delay(Duration::from_secs(30)))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let mut crawler = create_test_crawler(FailurePolicy::FailFast);
    crawler
        .register([format!("{}/slow", base_url), format!("{}/missing", base_url)])
        .expect("Failed to register seeds");

    let outcome = tokio::time::timeout(Duration::from_secs(10), crawler.run(&Context::background()))
        .await
        .expect("fail-fast run waited for the slow page");

    assert!(matches!(
        outcome,
        Err(CrawlError::Fetch {
            index: 1,
            source: FetchError::Status { status: 404, .. }
        })
    ));
}

#[tokio::test]
async fn test_best_effort_collects_every_outcome() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/one", r#"<img src="1.png">"#).await;
    Mock::given(method("GET"))
        .and(path("/gone"))
        .respond_with(ResponseTemplate::new(410))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/data"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(r#"<p><img src="plain.png"></p>"#, "text/plain"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/three", r#"<img src="3a.png"><img src="3b.png">"#).await;

    let mut crawler = create_test_crawler(FailurePolicy::BestEffort);
    crawler
        .register([
            format!("{}/one", base_url),
            format!("{}/gone", base_url),
            format!("{}/data", base_url),
            format!("{}/three", base_url),
        ])
        .expect("Failed to register seeds");

    let report = crawler
        .run_with_policy(&Context::background())
        .await
        .expect("Best-effort crawl failed");

    assert_eq!(report.len(), 4);
    assert_eq!(report.failures().count(), 1);
    assert_eq!(report.image_count(), 4);

    assert_eq!(report.get(0).unwrap().outcome.as_ref().unwrap(), &vec!["1.png"]);
    assert!(matches!(
        report.get(1).unwrap().outcome,
        Err(FetchError::Status { status: 410, .. })
    ));
    // Served as text/plain but still parsed as a document
    assert_eq!(report.get(2).unwrap().outcome.as_ref().unwrap(), &vec!["plain.png"]);
    assert_eq!(report.get(3).unwrap().outcome.as_ref().unwrap().len(), 2);
}

#[tokio::test]
async fn test_non_html_content_type_is_parsed() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/plain"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(r#"<img src="a.png"><img src="b.png">"#, "text/plain"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(r#"{"img": "x.png"}"#, "application/json"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut crawler = create_test_crawler(FailurePolicy::FailFast);
    crawler
        .register([format!("{}/plain", base_url), format!("{}/json", base_url)])
        .expect("Failed to register seeds");

    let results = crawler
        .run(&Context::background())
        .await
        .expect("non-HTML pages must not fail the run");

    assert_eq!(results[0], vec!["a.png", "b.png"]);
    assert!(results[1].is_empty());
}

#[tokio::test]
async fn test_cancel_returns_promptly() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .respond_with(html("<img src=\"never.png\">").set_delay(Duration::from_secs(30)))
        .mount(&mock_server)
        .await;

    let mut crawler = create_test_crawler(FailurePolicy::FailFast);
    crawler
        .register([format!("{}/a", base_url), format!("{}/b", base_url)])
        .expect("Failed to register seeds");

    let ctx = Context::background();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let outcome = tokio::time::timeout(Duration::from_secs(10), crawler.run(&ctx))
        .await
        .expect("cancelled run did not return promptly");

    assert!(matches!(
        outcome,
        Err(CrawlError::Cancelled(ContextError::Cancelled))
    ));
}

#[tokio::test]
async fn test_deadline_exceeded() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(html("").set_delay(Duration::from_secs(30)))
        .mount(&mock_server)
        .await;

    let mut crawler = create_test_crawler(FailurePolicy::FailFast);
    crawler
        .register([format!("{}/slow", mock_server.uri())])
        .expect("Failed to register seeds");

    let ctx = Context::background().with_timeout(Duration::from_millis(100));
    let outcome = tokio::time::timeout(Duration::from_secs(10), crawler.run(&ctx))
        .await
        .expect("run ignored its deadline");

    assert!(matches!(
        outcome,
        Err(CrawlError::Cancelled(ContextError::DeadlineExceeded))
    ));
}

#[tokio::test]
async fn test_unreachable_host_is_transport_error() {
    let mut crawler = create_test_crawler(FailurePolicy::BestEffort);
    crawler
        .register(["http://127.0.0.1:9/"])
        .expect("Failed to register seeds");

    let report = crawler.run_best_effort(&Context::background()).await;

    assert!(matches!(
        report.get(0).unwrap().outcome,
        Err(FetchError::Transport { .. })
    ));
}

#[tokio::test]
async fn test_unsupported_scheme_fails_at_run_time() {
    let mut crawler = create_test_crawler(FailurePolicy::FailFast);
    crawler
        .register(["ftp://127.0.0.1/pub/index.html"])
        .expect("absolute ftp seed must register");

    let err = crawler.run(&Context::background()).await.unwrap_err();

    assert!(matches!(
        err,
        CrawlError::Fetch {
            index: 0,
            source: FetchError::Transport { .. }
        }
    ));
}

#[tokio::test]
async fn test_crawl_entry_point_rejects_bad_seed() {
    let err = crawl(
        &Config::default(),
        ["https://example.com/", "not a url"],
        &Context::background(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ImgscrapeError::Register(ref e) if e.index == 1));
    assert!(err.is_input_error());
    assert!(!err.is_network_error());
}

#[tokio::test]
async fn test_crawl_entry_point_uses_config() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/", r#"<img src="logo.svg">"#).await;

    let config = Config {
        crawler: CrawlerConfig {
            failure_policy: FailurePolicy::BestEffort,
            ..CrawlerConfig::default()
        },
        ..Config::default()
    };

    let report = crawl(&config, [format!("{}/", mock_server.uri())], &Context::background())
        .await
        .expect("Crawl failed");

    assert_eq!(report.image_count(), 1);
    assert_eq!(report.get(0).unwrap().url.path(), "/");
}
