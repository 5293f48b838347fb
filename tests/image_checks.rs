mod common;

use brainrot_db::api::client::WikiClient;
use brainrot_db::model::CharacterRecord;
use brainrot_db::validation::image_check::{ImageCheck, ImageUrlChecker};
use brainrot_db::validation::{ImageCheckCache, Validator};
use common::{test_config, FakeWiki, Reply};
use reqwest::Method;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const GOOD: &str = "https://img.test/tim_cheese.png";
const MISSING: &str = "https://img.test/fluriflura.png";
const FORBIDDEN: &str = "https://img.test/trippi_troppi.png";
const NOT_AN_IMAGE: &str = "https://img.test/cappuccino_assassino.png";

fn wiki() -> Arc<FakeWiki> {
    Arc::new(
        FakeWiki::new()
            .route(GOOD, vec![Reply::png(vec![0u8; 4096])])
            .route(FORBIDDEN, vec![Reply::status(403)])
            .route(NOT_AN_IMAGE, vec![Reply::html("<html>".repeat(400))]),
    )
}

fn checker(wiki: Arc<FakeWiki>) -> ImageUrlChecker {
    let config = Arc::new(test_config(Path::new("unused")));
    let client = WikiClient::with_transport(config, wiki, CancellationToken::new());
    ImageUrlChecker::new(client, ImageCheckCache::new())
}

fn records() -> Vec<CharacterRecord> {
    [
        ("Tim Cheese", 500, GOOD),
        ("Fluriflura", 750, MISSING),
        ("Trippi Troppi", 2_000, FORBIDDEN),
        ("Cappuccino Assassino", 10_000, NOT_AN_IMAGE),
    ]
    .into_iter()
    .map(|(name, cost, url)| {
        CharacterRecord::new(name, "Common", cost, cost / 100)
            .unwrap()
            .with_image_url(url)
    })
    .collect()
}

#[tokio::test(start_paused = true)]
async fn each_url_is_checked_once() {
    let wiki = wiki();
    let checker = checker(wiki.clone());

    assert_eq!(checker.check(GOOD).await, ImageCheck::Reachable);
    assert_eq!(checker.check(GOOD).await, ImageCheck::Reachable);
    assert_eq!(checker.check(MISSING).await, ImageCheck::Missing);
    assert_eq!(checker.check(MISSING).await, ImageCheck::Missing);

    let calls = wiki.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.method == Method::HEAD));
    assert_eq!(checker.cache().len().await, 2);
}

#[tokio::test(start_paused = true)]
async fn forbidden_and_wrong_content_type_are_anomalies() {
    let checker = checker(wiki());
    assert!(matches!(checker.check(FORBIDDEN).await, ImageCheck::Anomaly(_)));
    match checker.check(NOT_AN_IMAGE).await {
        ImageCheck::Anomaly(reason) => assert!(reason.contains("text/html"), "{}", reason),
        other => panic!("expected an anomaly, got {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn lenient_batch_turns_bad_urls_into_warnings() {
    let wiki = wiki();
    let validator = Validator::new(false).with_image_checker(checker(wiki.clone()));
    let mut records = records();
    records.push(
        CharacterRecord::new("Bombardiro Crocodilo", "Epic", 50_000, 900)
            .unwrap()
            .with_image_url(GOOD),
    );

    let batch = validator.validate_batch(&records).await;

    assert!(batch.is_valid);
    assert!(batch.errors.is_empty(), "{:?}", batch.errors);
    assert_eq!(batch.rejected_count(), 0);
    assert_eq!(batch.stats.image_url_checks, 5);
    assert_eq!(wiki.calls_to(GOOD).len(), 1);

    assert!(batch
        .warnings
        .iter()
        .any(|w| w.starts_with("'Fluriflura': image_url: Image URL returned 404")));
    assert!(batch
        .warnings
        .iter()
        .any(|w| w.starts_with("'Trippi Troppi': image_url: Image URL anomaly")));
    assert!(batch
        .warnings
        .iter()
        .any(|w| w.starts_with("'Cappuccino Assassino': image_url: Image URL anomaly")));

    let accepted = batch.accepted_records();
    assert_eq!(accepted[0].image_url.as_deref(), Some(GOOD));
    assert_eq!(accepted[1].image_url, None);
    assert_eq!(accepted[2].image_url.as_deref(), Some(FORBIDDEN));
}

#[tokio::test(start_paused = true)]
async fn strict_batch_rejects_records_with_bad_urls() {
    let validator = Validator::new(true).with_image_checker(checker(wiki()));

    let batch = validator.validate_batch(&records()).await;

    assert!(batch.is_valid);
    assert_eq!(batch.rejected_count(), 3);
    let accepted = batch.accepted_records();
    assert_eq!(accepted.len(), 1);
    assert_eq!(accepted[0].name, "Tim Cheese");
    assert!(batch
        .errors
        .iter()
        .any(|e| e.starts_with("'Fluriflura': image_url: Image URL returned 404")));
}
