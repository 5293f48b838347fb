use crate::api::client::WikiClient;
use crate::api::fetchers;
use crate::api::transport::HttpTransport;
use crate::config::BuilderConfig;
use crate::core::cache::ResolutionCache;
use crate::core::images::ImageDownloader;
use crate::core::locator::PageLocator;
use crate::core::pipeline::{CharacterOutcome, CharacterPipeline, ImageStatus};
use crate::core::progress::{ProgressEvent, ProgressSnapshot, ProgressTracker};
use crate::core::stats::BuildReport;
use crate::error::{AppError, AppResult};
use crate::io::csv as csv_io;
use crate::logging::{log, LogLevel};
use crate::model::{CharacterRecord, Tier};
use crate::transform::roster::{parse_roster_page, Roster};
use crate::utils::{format_duration, run_cpu_intensive};
use crate::validation::image_check::{ImageCheckCache, ImageUrlChecker};
use crate::validation::Validator;
use chrono::Local;
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// Where accepted records end up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// A new file named from the configured template.
    Fresh,
    /// An existing CSV with the same header.
    Append(PathBuf),
}

#[derive(Default)]
struct BuildAccumulator {
    report: BuildReport,
    records: Vec<CharacterRecord>,
}

impl BuildAccumulator {
    fn absorb(
        mut self,
        tier: Tier,
        name: &str,
        result: AppResult<CharacterOutcome>,
        run_cancel: &CancellationToken,
        continue_on_error: bool,
        progress: &ProgressTracker,
    ) -> Self {
        match result {
            Ok(outcome) => {
                let stats = self.report.tier_mut(tier);
                stats.add_ok();
                match &outcome.image {
                    ImageStatus::Downloaded | ImageStatus::Reused => stats.add_image(true),
                    ImageStatus::Failed(_) => stats.add_image(false),
                    ImageStatus::NotAttempted => {}
                }
                self.report.warnings.extend(
                    outcome
                        .record
                        .extraction_errors
                        .iter()
                        .map(|e| format!("{}: {}", name, e)),
                );
                self.records.push(outcome.record);
                progress.record(ProgressEvent::Ok);
            }
            Err(AppError::Cancelled(_)) => {
                self.report.tier_mut(tier).add_skip();
                self.report.cancelled = true;
                progress.record(ProgressEvent::Skip);
            }
            Err(e) => {
                let failed = CharacterRecord::failed(name, tier.display_name(), &e);
                log(
                    LogLevel::Warning,
                    &format!("Character '{}' ({}) failed: {}", name, tier, e),
                );
                self.report.tier_mut(tier).add_fail();
                self.report.errors.push(format!(
                    "{}: {}",
                    failed.name,
                    failed.extraction_errors.join("; ")
                ));
                progress.record(ProgressEvent::Fail);
                if !continue_on_error && !run_cancel.is_cancelled() {
                    log(
                        LogLevel::Error,
                        "continue_on_error is off, skipping remaining characters.",
                    );
                    run_cancel.cancel();
                }
            }
        }
        self
    }
}

pub struct DatabaseBuilder {
    config: Arc<BuilderConfig>,
    client: WikiClient,
    pipeline: CharacterPipeline,
    validator: Validator,
    progress: Arc<ProgressTracker>,
    cancel: CancellationToken,
}

impl DatabaseBuilder {
    pub fn new(config: BuilderConfig, cancel: CancellationToken) -> AppResult<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let client = WikiClient::new(config.clone(), cancel.clone())?;
        Ok(Self::assemble(config, client, cancel))
    }

    pub fn with_transport(
        config: BuilderConfig,
        transport: Arc<dyn HttpTransport>,
        cancel: CancellationToken,
    ) -> AppResult<Self> {
        config.validate()?;
        let config = Arc::new(config);
        let client = WikiClient::with_transport(config.clone(), transport, cancel.clone());
        Ok(Self::assemble(config, client, cancel))
    }

    fn assemble(config: Arc<BuilderConfig>, client: WikiClient, cancel: CancellationToken) -> Self {
        let locator = PageLocator::new(client.clone(), ResolutionCache::new());
        let downloader = ImageDownloader::new(client.clone(), &config);
        let pipeline = CharacterPipeline::new(config.clone(), client.clone(), locator, downloader);

        let mut validator = Validator::new(config.strict);
        if config.check_image_urls {
            validator = validator
                .with_image_checker(ImageUrlChecker::new(client.clone(), ImageCheckCache::new()));
        }

        Self {
            config,
            client,
            pipeline,
            validator,
            progress: Arc::new(ProgressTracker::default()),
            cancel,
        }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &CharacterPipeline {
        &self.pipeline
    }

    /// Point-in-time view of the running extraction phase.
    pub fn progress(&self) -> ProgressSnapshot {
        self.progress.snapshot()
    }

    /// Reads the tier tabs of the wiki's roster page.
    pub async fn discover_roster(&self) -> AppResult<Roster> {
        let url = self.config.roster_url();
        log(LogLevel::Info, &format!("Discovering roster from {}", url));
        let html = fetchers::fetch_page_html(&self.client, &url).await?;
        let roster = run_cpu_intensive(move || parse_roster_page(&html)).await??;
        log(
            LogLevel::Success,
            &format!(
                "Discovered {} characters across {} tiers",
                roster.total(),
                roster.tiers().count()
            ),
        );
        Ok(roster)
    }

    /// Runs every character through the pipeline, validates the batch and writes the CSV.
    /// Per-character failures end up in the report; only directory setup and the CSV write
    /// itself can fail the whole build.
    pub async fn build(&self, roster: &Roster, target: OutputTarget) -> AppResult<BuildReport> {
        let overall_start = Instant::now();
        log(
            LogLevel::Step,
            &format!(
                "Starting database build for {} characters at {}",
                roster.total(),
                Local::now().format("%Y-%m-%d %H:%M:%S")
            ),
        );

        self.config.ensure_directories().await?;

        let phase_start = Instant::now();
        log(LogLevel::Step, "--- Phase 1: Character Extraction ---");
        let acc = self.extract_all(roster).await;
        let mut report = acc.report;
        let records = acc.records;
        report.tally();
        log_phase_completion(
            "Character Extraction",
            report.successful_extractions,
            report.failed_extractions,
            report.skipped_characters,
            phase_start.elapsed(),
        );

        let phase_start = Instant::now();
        log(LogLevel::Step, "--- Phase 2: Validation ---");
        let accepted = if records.is_empty() {
            log(LogLevel::Warning, "No records were extracted, nothing to validate.");
            Vec::new()
        } else {
            let batch = self.validator.validate_batch(&records).await;
            report.validation = batch.stats.clone();
            report.duplicates = batch.duplicates.clone();
            report.warnings.extend(batch.warnings.iter().cloned());
            report.errors.extend(batch.errors.iter().cloned());

            let rejected = batch.rejected_count();
            if rejected > 0 {
                log(
                    LogLevel::Warning,
                    &format!("{} record(s) rejected by validation", rejected),
                );
            }

            if self.config.fail_on_duplicates && batch.has_blocking_duplicates() {
                let err = AppError::Duplicate(format!(
                    "{} duplicate group(s) block the batch",
                    batch.duplicates.iter().filter(|g| g.kind.invalidates_batch()).count()
                ));
                log(LogLevel::Error, &format!("{}, not writing CSV.", err));
                report.errors.push(err.to_string());
                Vec::new()
            } else {
                batch.accepted_records()
            }
        };
        log_phase_completion(
            "Validation",
            accepted.len(),
            records.len() - accepted.len(),
            0,
            phase_start.elapsed(),
        );

        let phase_start = Instant::now();
        log(LogLevel::Step, "--- Phase 3: Save CSV ---");
        if accepted.is_empty() {
            log(LogLevel::Warning, "No accepted records to write.");
        } else {
            let (path, written) = match &target {
                OutputTarget::Fresh => {
                    let path = self.config.csv_path(&Local::now());
                    let written = csv_io::write_records(&path, &accepted).await?;
                    (path, written)
                }
                OutputTarget::Append(path) => {
                    let written = csv_io::append_records(path, &accepted).await?;
                    (path.clone(), written)
                }
            };
            report.records_written = written;
            report.csv_path = Some(path);
        }
        log_phase_completion(
            "Save CSV",
            report.records_written,
            0,
            0,
            phase_start.elapsed(),
        );

        report.duration = overall_start.elapsed();
        Ok(report)
    }

    /// Fold over the roster. Results stay in roster order regardless of worker count.
    async fn extract_all(&self, roster: &Roster) -> BuildAccumulator {
        let entries = roster.entries();
        let progress = self.progress.clone();
        progress.reset(entries.len());
        let run_cancel = self.cancel.child_token();
        let continue_on_error = self.config.continue_on_error;
        let workers = self.config.workers.max(1);

        log(
            LogLevel::Info,
            &format!(
                "Processing {} characters with {} worker(s)",
                entries.len(),
                workers
            ),
        );

        stream::iter(entries)
            .map(|(tier, name)| {
                let pipeline = self.pipeline.clone();
                let run_cancel = run_cancel.clone();
                let progress = progress.clone();
                async move {
                    let result = if run_cancel.is_cancelled() {
                        Err(AppError::Cancelled(name.clone()))
                    } else {
                        progress.begin(tier, &name);
                        tokio::select! {
                            biased;
                            _ = run_cancel.cancelled() => Err(AppError::Cancelled(name.clone())),
                            r = pipeline.process_character(tier, &name) => r,
                        }
                    };
                    (tier, name, result)
                }
            })
            .buffered(workers)
            .fold(BuildAccumulator::default(), |acc, (tier, name, result)| {
                let progress = progress.clone();
                let run_cancel = run_cancel.clone();
                async move {
                    acc.absorb(
                        tier,
                        &name,
                        result,
                        &run_cancel,
                        continue_on_error,
                        &progress,
                    )
                }
            })
            .await
    }
}

fn log_phase_completion(phase: &str, ok: usize, fail: usize, skip: usize, elapsed: Duration) {
    let level = if fail > 0 {
        LogLevel::Warning
    } else {
        LogLevel::Success
    };
    log(
        level,
        &format!(
            "--- {} Phase complete ({} OK, {} Fail, {} Skip) | Elapsed: {} ---",
            phase,
            ok,
            fail,
            skip,
            format_duration(elapsed)
        ),
    );
}
