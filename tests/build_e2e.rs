mod common;

use brainrot_db::core::stats::determine_exit_code;
use brainrot_db::core::{DatabaseBuilder, OutputTarget};
use brainrot_db::io::csv::{load_records, write_records};
use brainrot_db::model::{CharacterRecord, Tier};
use brainrot_db::transform::roster::Roster;
use common::{character_page, image_url, page_url, png_bytes, test_config, FakeWiki, Reply, BASE};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const CHARACTERS: [(&str, &str, &str, &str); 5] = [
    ("Tim Cheese", "Tim_Cheese.png", "$500", "$5/s"),
    ("Fluriflura", "Fluriflura.png", "$750", "$7/s"),
    ("Trippi Troppi", "TrippiTroppi.png", "$2,000", "$15/s"),
    ("Cappuccino Assassino", "Cappuccino_Assassino.png", "$10k", "$75/s"),
    ("Bombardiro Crocodilo", "Bombardiro.png", "$1.5M", "$2,500/s"),
];

fn roster() -> Roster {
    Roster::from_pairs([
        (Tier::Common, vec!["Tim Cheese", "Fluriflura"]),
        (Tier::Rare, vec!["Trippi Troppi", "Ghost Brainrot"]),
        (Tier::Epic, vec!["Cappuccino Assassino", "Bombardiro Crocodilo"]),
    ])
}

fn wiki() -> FakeWiki {
    let portrait = png_bytes(300, 360);
    CHARACTERS
        .iter()
        .fold(FakeWiki::new(), |wiki, (name, file, cost, income)| {
            wiki.page(
                &page_url(&name.replace(' ', "_")),
                &character_page(name, file, cost, income),
            )
            .route(&image_url(file), vec![Reply::png(portrait.clone())])
        })
}

#[tokio::test(start_paused = true)]
async fn one_missing_page_yields_five_rows_and_one_failure() {
    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(tmp.path());
    let csv_path = config.output_dir.join("brainrot_database.csv");
    let wiki = Arc::new(wiki());
    let builder =
        DatabaseBuilder::with_transport(config, wiki.clone(), CancellationToken::new()).unwrap();

    let report = builder.build(&roster(), OutputTarget::Fresh).await.unwrap();

    assert_eq!(report.total_characters, 6);
    assert_eq!(report.successful_extractions, 5);
    assert_eq!(report.failed_extractions, 1);
    assert_eq!(report.images_downloaded, 5);
    assert_eq!(report.records_written, 5);
    assert_eq!(report.csv_path.as_deref(), Some(csv_path.as_path()));
    assert!(report.errors.iter().any(|e| e.starts_with("Ghost Brainrot:")));
    assert!(!report.cancelled);
    assert_eq!(determine_exit_code(&report), 1);

    let progress = builder.progress();
    assert_eq!((progress.processed, progress.total), (6, 6));
    assert_eq!((progress.ok, progress.fail), (5, 1));

    let records = load_records(&csv_path).await.unwrap();
    assert_eq!(records.len(), 5);
    let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        [
            "Tim Cheese",
            "Fluriflura",
            "Trippi Troppi",
            "Cappuccino Assassino",
            "Bombardiro Crocodilo"
        ]
    );
    assert_eq!(records[0].tier, "Common");
    assert_eq!(records[0].cost, 500);
    assert_eq!(records[0].income, 5);
    assert_eq!(records[3].cost, 10_000);
    // Clamped to the cost ceiling in non-strict mode.
    assert_eq!(records[4].cost, 1_000_000);
    assert!(records.iter().all(|r| r
        .image_path
        .as_ref()
        .is_some_and(|p| p.is_file())));

    let tim_image = tmp.path().join("images").join("tim_cheese.png");
    assert_eq!(records[0].image_path.as_deref(), Some(tim_image.as_path()));

    // Thumbnails were rewritten to the original asset before download.
    assert_eq!(wiki.calls_to(&image_url("Tim_Cheese.png")).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn fail_fast_skips_remaining_characters() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = test_config(tmp.path());
    config.continue_on_error = false;
    config.workers = 1;
    let builder =
        DatabaseBuilder::with_transport(config, Arc::new(wiki()), CancellationToken::new())
            .unwrap();

    let report = builder.build(&roster(), OutputTarget::Fresh).await.unwrap();

    assert_eq!(report.successful_extractions, 3);
    assert_eq!(report.failed_extractions, 1);
    assert_eq!(report.skipped_characters, 2);
    assert!(report.cancelled);
    assert_eq!(report.records_written, 3);
}

#[tokio::test(start_paused = true)]
async fn existing_images_are_reused_without_fetching() {
    let tmp = tempfile::tempdir().unwrap();
    let config = test_config(tmp.path());
    std::fs::create_dir_all(&config.images_dir).unwrap();
    std::fs::write(config.images_dir.join("tim_cheese.png"), png_bytes(200, 200)).unwrap();

    let wiki = Arc::new(wiki());
    let builder =
        DatabaseBuilder::with_transport(config, wiki.clone(), CancellationToken::new()).unwrap();
    let roster = Roster::from_pairs([(Tier::Common, vec!["Tim Cheese"])]);

    let report = builder.build(&roster, OutputTarget::Fresh).await.unwrap();
    assert_eq!(report.images_downloaded, 1);
    assert_eq!(determine_exit_code(&report), 0);
    assert!(wiki.calls_to(&image_url("Tim_Cheese.png")).is_empty());
}

#[tokio::test(start_paused = true)]
async fn append_adds_rows_under_the_existing_header() {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = test_config(tmp.path());
    config.download_images = false;
    let existing = tmp.path().join("existing.csv");
    write_records(
        &existing,
        &[CharacterRecord::new("Noobini Pizzanini", "Common", 25, 1).unwrap()],
    )
    .await
    .unwrap();

    let builder =
        DatabaseBuilder::with_transport(config, Arc::new(wiki()), CancellationToken::new())
            .unwrap();
    let roster = Roster::from_pairs([(Tier::Common, vec!["Tim Cheese"])]);
    let report = builder
        .build(&roster, OutputTarget::Append(existing.clone()))
        .await
        .unwrap();

    assert_eq!(report.records_written, 1);
    let records = load_records(&existing).await.unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].name, "Tim Cheese");
    assert_eq!(records[1].image_path, None);
}

#[tokio::test(start_paused = true)]
async fn cancelled_before_start_writes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let cancel = CancellationToken::new();
    let builder =
        DatabaseBuilder::with_transport(test_config(tmp.path()), Arc::new(wiki()), cancel.clone())
            .unwrap();
    cancel.cancel();

    let report = builder.build(&roster(), OutputTarget::Fresh).await.unwrap();
    assert!(report.cancelled);
    assert_eq!(report.skipped_characters, 6);
    assert_eq!(report.records_written, 0);
    assert_eq!(determine_exit_code(&report), 1);
}

#[tokio::test(start_paused = true)]
async fn roster_discovery_reads_tier_tabs() {
    let tmp = tempfile::tempdir().unwrap();
    let roster_page = r#"<div class="tabber wds-tabber">
        <div class="wds-tab__content" data-tab-name="Common">
          <a href="/wiki/Tim_Cheese">Tim Cheese</a>
          <a href="/wiki/Fluriflura">Fluriflura</a>
        </div>
        <div class="wds-tab__content" data-tab-name="Secret">
          <a href="/wiki/La_Vacca_Saturno_Saturnita">La Vacca Saturno Saturnita</a>
          <a href="/wiki/Category:Secret">Secret</a>
        </div>
      </div>"#;
    let wiki = Arc::new(FakeWiki::new().page(&format!("{}/wiki/Brainrots", BASE), roster_page));
    let builder = DatabaseBuilder::with_transport(
        test_config(tmp.path()),
        wiki,
        CancellationToken::new(),
    )
    .unwrap();

    let roster = builder.discover_roster().await.unwrap();
    assert_eq!(roster.total(), 3);
    assert_eq!(roster.names(Tier::Secret), ["La Vacca Saturno Saturnita"]);
}
