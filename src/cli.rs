use crate::config::{self, BuilderConfig};
use crate::error::{AppError, AppResult};
use crate::logging::{log, LogLevel};
use crate::transform::roster::Roster;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Builds a character CSV database from the Steal a Brainrot wiki.",
    long_about = None,
    arg_required_else_help = true
)]
pub struct CliArgs {
    #[arg(
        long,
        value_name = "FILE_PATH",
        help = "JSON file mapping tier names to character names",
        conflicts_with_all = ["discover", "inspect_page"]
    )]
    roster: Option<String>,

    #[arg(
        long,
        help = "Discover the roster from the wiki's character list page",
        conflicts_with = "inspect_page"
    )]
    discover: bool,

    #[arg(long, default_value = config::DEFAULT_BASE_URL, value_name = "URL", help = "Wiki base URL")]
    base_url: String,

    #[arg(long, default_value = config::DEFAULT_OUTPUT_DIR, value_name = "DIR_PATH", help = "Directory for the CSV output")]
    out_dir: String,

    #[arg(long, default_value = config::DEFAULT_IMAGES_DIR, value_name = "DIR_PATH", help = "Directory for downloaded images")]
    images_dir: String,

    #[arg(long, default_value_t = config::DEFAULT_RATE_LIMIT_DELAY_SECS, value_name = "SECONDS", help = "Minimum delay between requests")]
    rate_limit: f64,

    #[arg(long, default_value_t = config::DEFAULT_MAX_RETRIES, value_name = "N", help = "Total attempts per request")]
    max_retries: u32,

    #[arg(long, default_value_t = config::DEFAULT_TIMEOUT_SECS, value_name = "SECONDS", help = "Per-request timeout")]
    timeout: u64,

    #[arg(long, default_value_t = config::DEFAULT_BACKOFF_FACTOR, value_name = "FACTOR", help = "Retry backoff multiplier")]
    backoff: f64,

    #[arg(long, default_value_t = config::DEFAULT_WORKERS, value_name = "N", help = "Characters processed concurrently")]
    workers: usize,

    #[arg(long, default_value_t = 1, value_name = "N", help = "Ranked image candidates to try per character")]
    max_image_candidates: usize,

    #[arg(long, help = "Do not embed a timestamp in the CSV filename")]
    no_timestamp: bool,

    #[arg(long, help = "Skip image downloads")]
    no_images: bool,

    #[arg(long, help = "Re-download images that already exist on disk")]
    redownload_images: bool,

    #[arg(long, help = "Skip format and dimension checks on downloaded images")]
    no_image_validation: bool,

    #[arg(long, help = "HEAD-check image URLs during validation")]
    check_image_urls: bool,

    #[arg(long, help = "Stop at the first character failure")]
    fail_fast: bool,

    #[arg(long, help = "Treat normalization issues as errors")]
    strict: bool,

    #[arg(long, help = "Write nothing when exact duplicates are found")]
    fail_on_duplicates: bool,

    #[arg(long, value_name = "CSV_PATH", help = "Append to an existing CSV instead of creating a new one")]
    append: Option<String>,

    #[arg(short, long, help = "Debug logging and detailed errors")]
    verbose: bool,

    #[arg(
        long,
        value_name = "HTML_PATH",
        help = "Inspect a saved character page offline",
        requires = "name"
    )]
    inspect_page: Option<String>,

    #[arg(long, value_name = "CHARACTER", help = "Character name for --inspect-page")]
    name: Option<String>,

    #[arg(
        long,
        default_value = "inspection.json",
        value_name = "OUTPUT_FILE",
        help = "Output file for --inspect-page",
        requires = "inspect_page"
    )]
    inspect_output: String,
}

impl CliArgs {
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    pub fn get_inspect_page(&self) -> Option<PathBuf> {
        self.inspect_page.as_deref().map(PathBuf::from)
    }

    pub fn get_inspect_name(&self) -> AppResult<String> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .ok_or_else(|| AppError::Argument("--name is required with --inspect-page".into()))
    }

    pub fn get_inspect_output(&self) -> PathBuf {
        PathBuf::from(&self.inspect_output)
    }

    pub fn get_append_target(&self) -> Option<PathBuf> {
        self.append.as_deref().map(PathBuf::from)
    }

    pub fn wants_discovery(&self) -> bool {
        self.discover
    }

    pub fn get_roster_file(&self) -> Option<PathBuf> {
        self.roster.as_deref().map(PathBuf::from)
    }

    pub fn to_config(&self) -> AppResult<BuilderConfig> {
        let config = BuilderConfig {
            base_url: self.base_url.trim_end_matches('/').to_string(),
            output_dir: PathBuf::from(&self.out_dir),
            images_dir: PathBuf::from(&self.images_dir),
            rate_limit_delay_secs: self.rate_limit,
            max_retries: self.max_retries,
            timeout_secs: self.timeout,
            backoff_factor: self.backoff,
            include_timestamp: !self.no_timestamp,
            download_images: !self.no_images,
            skip_existing_images: !self.redownload_images,
            validate_images: !self.no_image_validation,
            check_image_urls: self.check_image_urls,
            continue_on_error: !self.fail_fast,
            strict: self.strict,
            fail_on_duplicates: self.fail_on_duplicates,
            workers: self.workers,
            max_image_candidates: self.max_image_candidates,
            ..Default::default()
        };
        config
            .validate()
            .map_err(|e| AppError::Argument(e.to_string()))?;
        Ok(config)
    }

    /// Roster from `--roster`. `None` when `--discover` was chosen instead.
    pub async fn load_roster(&self) -> AppResult<Option<Roster>> {
        if let Some(path) = self.get_roster_file() {
            let json = tokio::fs::read_to_string(&path).await.map_err(|e| {
                AppError::Argument(format!(
                    "Cannot read roster file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            let roster = Roster::from_json(&json)?;
            log(
                LogLevel::Info,
                &format!(
                    "Loaded {} characters from {}",
                    roster.total(),
                    path.display()
                ),
            );
            return Ok(Some(roster));
        }
        if self.discover {
            return Ok(None);
        }
        Err(AppError::Argument(
            "No roster source. Use --roster FILE or --discover.".into(),
        ))
    }
}
