use crate::config;
use crate::logging::{log, LogLevel};
use crate::model::{DuplicateGroup, Tier, ValidationStats};
use crate::utils::{format_duration, percentage};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TierStats {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub images_downloaded: usize,
    pub images_failed: usize,
}

impl TierStats {
    pub fn add_ok(&mut self) {
        self.attempted += 1;
        self.succeeded += 1;
    }
    pub fn add_fail(&mut self) {
        self.attempted += 1;
        self.failed += 1;
    }
    pub fn add_skip(&mut self) {
        self.skipped += 1;
    }
    pub fn add_image(&mut self, downloaded: bool) {
        if downloaded {
            self.images_downloaded += 1;
        } else {
            self.images_failed += 1;
        }
    }
}

pub type TierStatsMap = BTreeMap<Tier, TierStats>;

#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildReport {
    pub total_characters: usize,
    pub successful_extractions: usize,
    pub failed_extractions: usize,
    pub skipped_characters: usize,
    pub images_downloaded: usize,
    pub images_failed: usize,
    pub records_written: usize,
    pub csv_path: Option<PathBuf>,
    pub duration: Duration,
    pub tier_stats: TierStatsMap,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub validation: ValidationStats,
    pub duplicates: Vec<DuplicateGroup>,
    pub cancelled: bool,
}

impl BuildReport {
    pub fn success_rate(&self) -> f64 {
        percentage(self.successful_extractions, self.total_characters)
    }

    pub fn image_success_rate(&self) -> f64 {
        percentage(
            self.images_downloaded,
            self.images_downloaded + self.images_failed,
        )
    }

    pub fn tier_mut(&mut self, tier: Tier) -> &mut TierStats {
        self.tier_stats.entry(tier).or_default()
    }

    /// Recomputes the global counters from the per-tier ones.
    pub fn tally(&mut self) {
        let mut totals = TierStats::default();
        for s in self.tier_stats.values() {
            totals.attempted += s.attempted;
            totals.succeeded += s.succeeded;
            totals.failed += s.failed;
            totals.skipped += s.skipped;
            totals.images_downloaded += s.images_downloaded;
            totals.images_failed += s.images_failed;
        }
        self.total_characters = totals.attempted + totals.skipped;
        self.successful_extractions = totals.succeeded;
        self.failed_extractions = totals.failed;
        self.skipped_characters = totals.skipped;
        self.images_downloaded = totals.images_downloaded;
        self.images_failed = totals.images_failed;
    }
}

fn print_preview(title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("{} ({}):", title, items.len());
    for item in items.iter().take(config::SUMMARY_PREVIEW_LIMIT) {
        println!("  - {}", item);
    }
    if items.len() > config::SUMMARY_PREVIEW_LIMIT {
        println!(
            "  ... and {} more",
            items.len() - config::SUMMARY_PREVIEW_LIMIT
        );
    }
}

pub fn print_summary(report: &BuildReport) {
    let sep = "=".repeat(72);
    println!("\n{}\n{:^72}\n{}", sep, "Database Build Summary", sep);
    println!("Total Run Time:    {}", format_duration(report.duration));
    println!("Characters:        {}", report.total_characters);
    println!(
        "Extracted:         {} ({:.1}%)",
        report.successful_extractions,
        report.success_rate()
    );
    println!("Failed:            {}", report.failed_extractions);
    if report.skipped_characters > 0 {
        println!("Skipped:           {}", report.skipped_characters);
    }
    println!(
        "Images:            {} downloaded, {} failed ({:.1}%)",
        report.images_downloaded,
        report.images_failed,
        report.image_success_rate()
    );
    println!("Records Written:   {}", report.records_written);
    if let Some(path) = &report.csv_path {
        println!("CSV:               {}", path.display());
    }
    println!("{}", "-".repeat(72));

    println!(
        "{:<17} {:<10} {:<8} {:<8} {:<8} {:<10} {:<8}",
        "Tier", "Attempted", "OK", "Fail", "Skip", "Images", "Img Fail"
    );
    println!("{}", "-".repeat(72));
    for (tier, s) in &report.tier_stats {
        println!(
            "{:<17} {:<10} {:<8} {:<8} {:<8} {:<10} {:<8}",
            tier.display_name(),
            s.attempted,
            s.succeeded,
            s.failed,
            s.skipped,
            s.images_downloaded,
            s.images_failed
        );
    }
    println!("{}", "-".repeat(72));

    let v = &report.validation;
    println!(
        "Validation:        {} checked, {} names normalized, {} numeric corrections, {} image URL checks, {} duplicates",
        v.records_validated,
        v.names_normalized,
        v.numeric_corrections,
        v.image_url_checks,
        v.duplicates_found
    );
    println!("{}", sep);

    print_preview("Warnings", &report.warnings);
    print_preview("Errors", &report.errors);

    log_overall_status(report);
}

fn log_overall_status(report: &BuildReport) {
    if report.cancelled {
        log(
            LogLevel::Warning,
            "Build was cancelled before every character was processed.",
        );
    }
    if report.records_written == 0 {
        log(LogLevel::Error, "Build finished without writing any records.");
    } else if report.failed_extractions > 0 {
        log(
            LogLevel::Warning,
            &format!(
                "Build completed with {} failed extraction(s). Check logs.",
                report.failed_extractions
            ),
        );
    } else {
        log(LogLevel::Success, "Build completed successfully.");
    }
}

pub fn determine_exit_code(report: &BuildReport) -> i32 {
    if report.failed_extractions > 0 || report.records_written == 0 {
        1
    } else {
        0
    }
}
