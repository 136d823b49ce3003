//! Integration tests for the full pipeline: register sources, merge, write.
//!
//! Each test starts its own mock HTTP server, so sources are fully isolated.
//! These tests exercise resolution, merging and serialization end-to-end,
//! verifying that the stages compose correctly.

use chrono::{TimeZone, Utc};
use feedmerge::feed::{
    parse_feed, Aggregator, ChannelInfo, FetchLimits, ResolutionState, Resolver,
};
use pretty_assertions::assert_eq;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn aggregator() -> Aggregator {
    let resolver = Resolver::new(reqwest::Client::new(), FetchLimits::default());
    Aggregator::new(resolver, ChannelInfo::default())
}

fn rss(items: &[(&str, Option<&str>)]) -> String {
    let body: String = items
        .iter()
        .map(|(title, date)| match date {
            Some(date) => format!("<item><title>{title}</title><pubDate>{date}</pubDate></item>"),
            None => format!("<item><title>{title}</title></item>"),
        })
        .collect();
    format!(r#"<?xml version="1.0"?><rss version="2.0"><channel><title>T</title>{body}</channel></rss>"#)
}

async fn serve(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn item_titles(aggregator: &Aggregator) -> Vec<String> {
    aggregator
        .aggregate()
        .items
        .into_iter()
        .map(|i| i.title)
        .collect()
}

// ============================================================================
// Ordering
// ============================================================================

#[tokio::test]
async fn test_newer_item_listed_first() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/feed",
        rss(&[
            ("A", Some("Mon, 01 Jan 2024 00:00:00 GMT")),
            ("B", Some("Tue, 02 Jan 2024 00:00:00 GMT")),
        ]),
    )
    .await;

    let mut agg = aggregator();
    assert!(agg.register(&format!("{}/feed", server.uri())).await);
    assert_eq!(item_titles(&agg), vec!["B", "A"]);
}

#[tokio::test]
async fn test_equal_timestamps_keep_source_order() {
    let server = MockServer::start().await;
    let date = Some("Mon, 01 Jan 2024 00:00:00 GMT");
    serve(&server, "/one", rss(&[("from-one", date)])).await;
    serve(&server, "/two", rss(&[("from-two", date)])).await;

    let mut agg = aggregator();
    let urls = vec![
        format!("{}/one", server.uri()),
        format!("{}/two", server.uri()),
    ];
    assert_eq!(agg.register_all(&urls, |_| {}).await, 2);
    assert_eq!(item_titles(&agg), vec!["from-one", "from-two"]);
}

#[tokio::test]
async fn test_concurrent_registration_keeps_input_order() {
    let server = MockServer::start().await;
    // The first source answers last
    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(rss(&[("slow", None)]))
                .set_delay(std::time::Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    serve(&server, "/fast", rss(&[("fast", None)])).await;

    let mut agg = aggregator().with_concurrency(2);
    let urls = vec![
        format!("{}/slow", server.uri()),
        format!("{}/fast", server.uri()),
    ];
    let mut reported = Vec::new();
    agg.register_all(&urls, |r| reported.push(r.url.clone())).await;

    assert_eq!(reported, urls);
    let registered: Vec<_> = agg.sources().iter().map(|s| s.url.clone()).collect();
    assert_eq!(registered, urls);
    // Both undated: same fallback time, so registration order decides
    assert_eq!(item_titles(&agg), vec!["slow", "fast"]);
}

#[tokio::test]
async fn test_undated_item_uses_build_time() {
    let server = MockServer::start().await;
    serve(&server, "/feed", rss(&[("undated", None)])).await;

    let mut agg = aggregator();
    assert!(agg.register(&format!("{}/feed", server.uri())).await);

    let before = Utc::now();
    let merged = agg.aggregate();
    let after = Utc::now();

    let published = merged.items[0].published;
    assert!(published >= before && published <= after);
    assert_eq!(published, merged.last_build);
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn test_html_page_discovers_feed() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/blog/",
        r#"<html><head><link rel="alternate" type="application/rss+xml" href="/feed.xml"></head></html>"#
            .to_owned(),
    )
    .await;
    serve(&server, "/blog/feed.xml", rss(&[("post", None)])).await;

    let mut agg = aggregator();
    assert!(agg.register(&format!("{}/blog/", server.uri())).await);

    let source = &agg.sources()[0];
    assert_eq!(source.state, ResolutionState::HtmlLink);
    assert_eq!(
        source.feed_url.as_deref(),
        Some(format!("{}/blog/feed.xml", server.uri()).as_str())
    );
}

#[tokio::test]
async fn test_page_without_feed_link_not_registered() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/about",
        "<html><head><title>About</title></head></html>".to_owned(),
    )
    .await;

    let mut agg = aggregator();
    assert!(!agg.register(&format!("{}/about", server.uri())).await);
    assert!(agg.sources().is_empty());
}

#[tokio::test]
async fn test_failing_source_does_not_stop_batch() {
    let server = MockServer::start().await;
    serve(&server, "/good", rss(&[("kept", None)])).await;
    Mock::given(method("GET"))
        .and(path("/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut agg = aggregator();
    let urls = vec![
        format!("{}/broken", server.uri()),
        "http://127.0.0.1:9/unreachable".to_owned(),
        format!("{}/good", server.uri()),
    ];
    let mut outcomes = Vec::new();
    let succeeded = agg
        .register_all(&urls, |r| outcomes.push((r.url.clone(), r.state)))
        .await;

    assert_eq!(succeeded, 1);
    assert_eq!(
        outcomes,
        vec![
            (urls[0].clone(), ResolutionState::Failed),
            (urls[1].clone(), ResolutionState::Failed),
            (urls[2].clone(), ResolutionState::Direct),
        ]
    );
    assert_eq!(item_titles(&agg), vec!["kept"]);
}

#[tokio::test]
async fn test_same_url_registered_twice_is_stored_twice() {
    let server = MockServer::start().await;
    serve(&server, "/feed", rss(&[("dup", None)])).await;

    let mut agg = aggregator();
    let url = format!("{}/feed", server.uri());
    assert!(agg.register(&url).await);
    assert!(agg.register(&url).await);

    assert_eq!(agg.sources().len(), 2);
    assert_eq!(item_titles(&agg), vec!["dup", "dup"]);
}

// ============================================================================
// Build
// ============================================================================

#[tokio::test]
async fn test_build_with_no_sources_writes_empty_feed() {
    let dir = std::env::temp_dir().join("feedmerge_pipeline_test_empty");
    std::fs::create_dir_all(&dir).unwrap();
    let dest = dir.join("combined_feed.xml");

    let written = aggregator().build(&dest).unwrap();
    assert_eq!(written, dest);

    let content = std::fs::read(&dest).unwrap();
    let parsed = parse_feed(&content).unwrap();
    assert!(parsed.entries.is_empty());
    assert_eq!(parsed.title.as_deref(), Some("AI and ML News Aggregator"));

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_build_writes_merged_items() {
    let server = MockServer::start().await;
    serve(
        &server,
        "/a",
        rss(&[("a-old", Some("Mon, 01 Jan 2024 00:00:00 GMT"))]),
    )
    .await;
    serve(
        &server,
        "/b",
        rss(&[("b-new", Some("Wed, 03 Jan 2024 00:00:00 GMT"))]),
    )
    .await;

    let mut agg = aggregator();
    agg.register_all(
        &[format!("{}/a", server.uri()), format!("{}/b", server.uri())],
        |_| {},
    )
    .await;

    let dir = std::env::temp_dir().join("feedmerge_pipeline_test_merged");
    std::fs::create_dir_all(&dir).unwrap();
    let dest = dir.join("combined_feed.xml");
    agg.build(&dest).unwrap();

    let parsed = parse_feed(&std::fs::read(&dest).unwrap()).unwrap();
    let titles: Vec<_> = parsed
        .entries
        .iter()
        .map(|e| e.title.clone().unwrap_or_default())
        .collect();
    assert_eq!(titles, vec!["b-new", "a-old"]);
    assert_eq!(
        parsed.entries[0].published,
        Some(Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap())
    );

    std::fs::remove_dir_all(&dir).ok();
}

#[tokio::test]
async fn test_build_to_unwritable_destination_fails() {
    let dest = std::path::Path::new("/tmp/feedmerge_no_such_dir/nested/combined_feed.xml");
    assert!(aggregator().build(dest).is_err());
}
