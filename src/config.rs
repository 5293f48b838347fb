use crate::error::{AppError, AppResult};
use chrono::{DateTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

pub const DEFAULT_BASE_URL: &str = "https://stealabrainrot.fandom.com";
pub const ROSTER_PAGE_PATH: &str = "/wiki/Brainrots";
pub const DEFAULT_OUTPUT_DIR: &str = "databases";
pub const DEFAULT_IMAGES_DIR: &str = "images";

pub const DEFAULT_RATE_LIMIT_DELAY_SECS: f64 = 2.0;
pub const MIN_RATE_LIMIT_DELAY_SECS: f64 = 0.5;
pub const MAX_RATE_LIMIT_DELAY_SECS: f64 = 60.0;
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_BACKOFF_FACTOR: f64 = 2.0;
pub const MAX_RETRY_DELAY_SECS: f64 = 60.0;
pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_WORKERS: usize = 4;

pub const USER_AGENT_VAL: &str = "TradingCardGenerator/1.0 (Educational/Research Tool)";

pub const CSV_FILENAME_TEMPLATE: &str = "brainrot_database_{timestamp}.csv";
pub const CSV_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
pub const CSV_HEADERS: [&str; 6] = [
    "Character Name",
    "Tier",
    "Cost",
    "Income per Second",
    "Variant Type",
    "Image Path",
];

pub const SUPPORTED_IMAGE_EXTENSIONS: [&str; 5] = [".png", ".jpg", ".jpeg", ".gif", ".webp"];
/// Extensions accepted when checking a remote image URL. Wider than what gets downloaded.
pub const RECOGNIZED_IMAGE_EXTENSIONS: [&str; 6] = [".png", ".jpg", ".jpeg", ".gif", ".webp", ".bmp"];
pub const MIN_IMAGE_DIMENSION: u32 = 150;
pub const MIN_ASPECT_RATIO: f64 = 0.33;
pub const MAX_ASPECT_RATIO: f64 = 3.0;
pub const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024;
pub const REMOTE_IMAGE_MIN_BYTES: u64 = 1024;
pub const REMOTE_IMAGE_MAX_BYTES: u64 = 10 * 1024 * 1024;

pub const ASSET_HOSTS: [&str; 2] = ["static.wikia.nocookie.net", "vignette.wikia.nocookie.net"];

/// Any of these in a candidate URL disqualifies it.
pub const EXCLUDED_IMAGE_TOKENS: [&str; 15] = [
    "site-logo",
    "wiki-logo",
    "favicon",
    "cursor",
    "button",
    "arrow",
    "edit",
    "delete",
    "admin",
    "staff",
    "moderator",
    "template",
    "navigation",
    "menu",
    "wordmark",
];
/// Known false positives, excluded unless the character's own name contains them.
pub const NAME_COLLISION_TOKENS: [&str; 1] = ["tralaleritos"];
pub const FOREIGN_IMAGE_HOSTS: [&str; 2] = ["commons.wikimedia.org", "upload.wikimedia.org"];
pub const VARIANT_TOKENS: [&str; 9] = [
    "gold",
    "silver",
    "variant",
    "alt",
    "alternative",
    "v2",
    "new",
    "old",
    "beta",
];
pub const GROUP_TOKENS: [&str; 7] = ["group", "team", "multiple", "all", "together", "cast", "lineup"];

pub const SKIP_LINK_NAMESPACES: [&str; 7] = [
    "category:",
    "file:",
    "template:",
    "help:",
    "special:",
    "user:",
    "talk:",
];
pub const SKIP_LINK_PAGES: [&str; 2] = ["brainrots", "main_page"];

pub const COST_LABELS: [&str; 3] = ["cost", "price", "buy"];
pub const INCOME_LABELS: [&str; 5] = ["income", "per second", "per_second", "earn", "profit"];

pub const NAME_MIN_LEN: usize = 2;
pub const NAME_MAX_LEN: usize = 50;
pub const PLACEHOLDER_NAMES: [&str; 5] = ["unknown", "unnamed", "null", "none", ""];
pub const COST_MAX: u64 = 1_000_000;
pub const INCOME_MAX: u64 = 100_000;

pub const TIER_SIMILARITY_THRESHOLD: f64 = 0.7;
pub const SIMILAR_NAME_THRESHOLD: f64 = 0.9;
pub const SAME_STATS_NAME_THRESHOLD: f64 = 0.7;

pub const SUMMARY_PREVIEW_LIMIT: usize = 10;

pub static BASE_HEADERS: Lazy<HeaderMap> = Lazy::new(|| {
    let mut h = HeaderMap::new();
    h.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VAL));
    h.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    h.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    h
});

pub static FORBIDDEN_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1f\x7f]"#).expect("Invalid forbidden chars regex"));
pub static WHITESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));
pub static NAME_INVALID_CHARS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[^A-Za-z0-9\s\-.'()&]").expect("Invalid name character regex")
});
pub static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d[\d,]*(?:\.\d+)?)\s*([kmb])?").expect("Invalid number regex")
});
pub static SCALE_SUFFIX_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"/scale-to-(?:width|height)-down/\d+").expect("Invalid scale suffix regex")
});
pub static REVISION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/revision/[^?]*").expect("Invalid revision regex"));

/// Additive weights for the portrait scoring table. Only their relative order is load-bearing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub primary_slot: i64,
    pub infobox_slot: i64,
    pub hero_slot: i64,
    pub data_attribute: i64,
    pub fallback: i64,
    pub exact_filename: i64,
    pub filename_prefix: i64,
    pub filename_contains: i64,
    pub name_word_fraction: i64,
    pub all_name_words: i64,
    pub alt_text: i64,
    pub title_text: i64,
    pub asset_cdn: i64,
    pub variant_penalty: i64,
    pub group_penalty: i64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            primary_slot: 2000,
            infobox_slot: 1500,
            hero_slot: 1200,
            data_attribute: 1000,
            fallback: 0,
            exact_filename: 300,
            filename_prefix: 200,
            filename_contains: 150,
            name_word_fraction: 100,
            all_name_words: 50,
            alt_text: 80,
            title_text: 80,
            asset_cdn: 60,
            variant_penalty: -15,
            group_penalty: -30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    pub base_url: String,
    pub roster_page_path: String,
    pub output_dir: PathBuf,
    pub images_dir: PathBuf,
    pub rate_limit_delay_secs: f64,
    /// Total attempts per request, first try included.
    pub max_retries: u32,
    pub timeout_secs: u64,
    pub backoff_factor: f64,
    pub csv_filename_template: String,
    pub include_timestamp: bool,
    pub download_images: bool,
    pub skip_existing_images: bool,
    pub validate_images: bool,
    pub check_image_urls: bool,
    pub continue_on_error: bool,
    pub strict: bool,
    pub fail_on_duplicates: bool,
    pub workers: usize,
    pub max_image_candidates: usize,
    pub scoring: ScoringWeights,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            roster_page_path: ROSTER_PAGE_PATH.to_string(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            images_dir: PathBuf::from(DEFAULT_IMAGES_DIR),
            rate_limit_delay_secs: DEFAULT_RATE_LIMIT_DELAY_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            backoff_factor: DEFAULT_BACKOFF_FACTOR,
            csv_filename_template: CSV_FILENAME_TEMPLATE.to_string(),
            include_timestamp: true,
            download_images: true,
            skip_existing_images: true,
            validate_images: true,
            check_image_urls: false,
            continue_on_error: true,
            strict: false,
            fail_on_duplicates: false,
            workers: DEFAULT_WORKERS,
            max_image_candidates: 1,
            scoring: ScoringWeights::default(),
        }
    }
}

impl BuilderConfig {
    pub fn validate(&self) -> AppResult<()> {
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(AppError::ConfigError(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if !self.rate_limit_delay_secs.is_finite()
            || !(MIN_RATE_LIMIT_DELAY_SECS..=MAX_RATE_LIMIT_DELAY_SECS)
                .contains(&self.rate_limit_delay_secs)
        {
            return Err(AppError::ConfigError(format!(
                "rate_limit_delay must be between {} and {} seconds, got {}",
                MIN_RATE_LIMIT_DELAY_SECS, MAX_RATE_LIMIT_DELAY_SECS, self.rate_limit_delay_secs
            )));
        }
        if !(1..=10).contains(&self.max_retries) {
            return Err(AppError::ConfigError(format!(
                "max_retries must be between 1 and 10, got {}",
                self.max_retries
            )));
        }
        if !(5..=300).contains(&self.timeout_secs) {
            return Err(AppError::ConfigError(format!(
                "timeout must be between 5 and 300 seconds, got {}",
                self.timeout_secs
            )));
        }
        if !self.backoff_factor.is_finite() || !(1.0..=10.0).contains(&self.backoff_factor) {
            return Err(AppError::ConfigError(format!(
                "backoff_factor must be between 1.0 and 10.0, got {}",
                self.backoff_factor
            )));
        }
        if self.workers == 0 {
            return Err(AppError::ConfigError("workers must be at least 1".into()));
        }
        if self.max_image_candidates == 0 {
            return Err(AppError::ConfigError(
                "max_image_candidates must be at least 1".into(),
            ));
        }
        if !self.csv_filename_template.ends_with(".csv") {
            return Err(AppError::ConfigError(format!(
                "csv_filename_template must end with .csv, got '{}'",
                self.csv_filename_template
            )));
        }
        Ok(())
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_secs_f64(self.rate_limit_delay_secs.max(MIN_RATE_LIMIT_DELAY_SECS))
    }

    /// Backoff before retry number `attempt` (0-based), capped at [`MAX_RETRY_DELAY_SECS`].
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let raw = self.rate_limit_delay_secs * self.backoff_factor.powi(exponent);
        Duration::from_secs_f64(raw.min(MAX_RETRY_DELAY_SECS))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn roster_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.roster_page_path
        )
    }

    pub fn csv_filename<Tz>(&self, now: &DateTime<Tz>) -> String
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        if self.include_timestamp {
            let stamp = now.format(CSV_TIMESTAMP_FORMAT).to_string();
            self.csv_filename_template.replace("{timestamp}", &stamp)
        } else {
            self.csv_filename_template
                .replace("_{timestamp}", "")
                .replace("{timestamp}", "")
        }
    }

    pub fn csv_path<Tz>(&self, now: &DateTime<Tz>) -> PathBuf
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        self.output_dir.join(self.csv_filename(now))
    }

    pub async fn ensure_directories(&self) -> AppResult<()> {
        ensure_writable_dir(&self.output_dir).await?;
        if self.download_images {
            ensure_writable_dir(&self.images_dir).await?;
        }
        Ok(())
    }
}

async fn ensure_writable_dir(dir: &Path) -> AppResult<()> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| AppError::persistence(dir, format!("cannot create directory: {}", e)))?;

    let probe = dir.join(".write_test");
    fs::write(&probe, b"probe")
        .await
        .map_err(|e| AppError::persistence(dir, format!("directory is not writable: {}", e)))?;
    let _ = fs::remove_file(&probe).await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn default_config_is_valid() {
        assert!(BuilderConfig::default().validate().is_ok());
    }

    #[test]
    fn rate_limit_below_floor_is_rejected() {
        let config = BuilderConfig {
            rate_limit_delay_secs: 0.1,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AppError::ConfigError(_))));
    }

    #[test]
    fn retry_delays_grow_and_cap() {
        let config = BuilderConfig::default();
        assert_eq!(config.retry_delay(0), Duration::from_secs(2));
        assert_eq!(config.retry_delay(1), Duration::from_secs(4));
        assert_eq!(config.retry_delay(2), Duration::from_secs(8));
        assert_eq!(config.retry_delay(10), Duration::from_secs(60));

        let schedule: Vec<Duration> = (0..8).map(|a| config.retry_delay(a)).collect();
        assert!(schedule.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn csv_filename_embeds_timestamp() {
        let config = BuilderConfig::default();
        let now = Utc.with_ymd_and_hms(2025, 7, 14, 9, 5, 3).unwrap();
        assert_eq!(
            config.csv_filename(&now),
            "brainrot_database_20250714_090503.csv"
        );

        let plain = BuilderConfig {
            include_timestamp: false,
            ..Default::default()
        };
        assert_eq!(plain.csv_filename(&now), "brainrot_database.csv");
    }

    #[tokio::test]
    async fn ensure_directories_creates_missing_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let config = BuilderConfig {
            output_dir: tmp.path().join("out"),
            images_dir: tmp.path().join("out").join("images"),
            ..Default::default()
        };
        config.ensure_directories().await.unwrap();
        assert!(config.output_dir.is_dir());
        assert!(config.images_dir.is_dir());
        assert!(!config.output_dir.join(".write_test").exists());
    }
}
