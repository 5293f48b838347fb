mod common;

use brainrot_db::api::client::WikiClient;
use brainrot_db::config::BuilderConfig;
use brainrot_db::error::AppError;
use common::{page_url, FakeWiki, Reply};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn client(wiki: Arc<FakeWiki>, config: BuilderConfig) -> WikiClient {
    WikiClient::with_transport(Arc::new(config), wiki, CancellationToken::new())
}

fn fast_config() -> BuilderConfig {
    BuilderConfig {
        rate_limit_delay_secs: 0.5,
        max_retries: 4,
        ..Default::default()
    }
}

#[tokio::test(start_paused = true)]
async fn transient_failures_use_exactly_max_retries_attempts() {
    let url = page_url("Tim_Cheese");
    let wiki = Arc::new(FakeWiki::new().route(
        &url,
        vec![
            Reply::status(503),
            Reply::ConnectionReset,
            Reply::status(502),
            Reply::status(500),
        ],
    ));
    let config = fast_config();
    let client = client(wiki.clone(), config.clone());

    let err = client.get(&url).await.unwrap_err();
    match err {
        AppError::TransientNetwork { attempts, .. } => assert_eq!(attempts, config.max_retries),
        other => panic!("expected TransientNetwork, got {:?}", other),
    }

    let calls = wiki.calls_to(&url);
    assert_eq!(calls.len(), config.max_retries as usize);

    let gaps: Vec<Duration> = calls.windows(2).map(|w| w[1].at - w[0].at).collect();
    assert!(gaps.windows(2).all(|g| g[0] <= g[1]), "gaps {:?}", gaps);
    for (i, gap) in gaps.iter().enumerate() {
        assert!(*gap >= config.retry_delay(i as u32), "gap {} was {:?}", i, gap);
    }
}

#[tokio::test(start_paused = true)]
async fn recovers_after_a_transient_failure() {
    let url = page_url("Fluriflura");
    let wiki = Arc::new(FakeWiki::new().route(
        &url,
        vec![Reply::status(429), Reply::html("<p>Fluriflura</p>")],
    ));
    let client = client(wiki.clone(), fast_config());

    let html = client.get_text(&url).await.unwrap();
    assert!(html.contains("Fluriflura"));
    assert_eq!(wiki.calls_to(&url).len(), 2);
}

#[tokio::test(start_paused = true)]
async fn not_found_is_never_retried() {
    let url = page_url("Ghost");
    let wiki = Arc::new(FakeWiki::new());
    let client = client(wiki.clone(), fast_config());

    let err = client.get(&url).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(wiki.calls_to(&url).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn forbidden_is_terminal() {
    let url = page_url("Locked");
    let wiki = Arc::new(FakeWiki::new().route(&url, vec![Reply::status(403)]));
    let client = client(wiki.clone(), fast_config());

    let err = client.get(&url).await.unwrap_err();
    assert!(matches!(err, AppError::HttpStatus { status: 403, .. }));
    assert_eq!(wiki.calls_to(&url).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn pacing_gate_holds_across_concurrent_requests() {
    let wiki = Arc::new(
        FakeWiki::new()
            .page(&page_url("A"), "<p>a</p>")
            .page(&page_url("B"), "<p>b</p>")
            .page(&page_url("C"), "<p>c</p>"),
    );
    let config = fast_config();
    let min_interval = config.min_request_interval();
    let client = client(wiki.clone(), config);

    let (url_a, url_b, url_c) = (page_url("A"), page_url("B"), page_url("C"));
    let (a, b, c) = tokio::join!(
        client.get(&url_a),
        client.get(&url_b),
        client.get(&url_c),
    );
    assert!(a.is_ok() && b.is_ok() && c.is_ok());

    let mut times: Vec<_> = wiki.calls().into_iter().map(|c| c.at).collect();
    times.sort();
    assert_eq!(times.len(), 3);
    for pair in times.windows(2) {
        assert!(pair[1] - pair[0] >= min_interval);
    }
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_retrying() {
    let url = page_url("Slow");
    let wiki = Arc::new(FakeWiki::new().route(&url, vec![Reply::status(503)]));
    let cancel = CancellationToken::new();
    let client = WikiClient::with_transport(Arc::new(fast_config()), wiki.clone(), cancel.clone());

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        canceller.cancel();
    });

    let err = client.get(&url).await.unwrap_err();
    assert!(matches!(err, AppError::Cancelled(_)));
    assert_eq!(wiki.calls_to(&url).len(), 1);
}
