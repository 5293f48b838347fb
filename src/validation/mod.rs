pub mod duplicates;
pub mod fields;
pub mod image_check;

use crate::config;
use crate::model::{
    BatchValidation, CharacterRecord, DuplicateGroup, FieldOutcome, ValidationOutcome,
    ValidationStats,
};
use image_check::{ImageCheck, ImageUrlChecker};

pub use duplicates::{classify_pair, detect_duplicates, name_similarity};
pub use fields::normalize_name;
pub use image_check::ImageCheckCache;

/// Field checks, optional image URL checks and duplicate detection over a collected batch.
#[derive(Clone)]
pub struct Validator {
    strict: bool,
    image_checker: Option<ImageUrlChecker>,
}

impl Validator {
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            image_checker: None,
        }
    }

    pub fn with_image_checker(mut self, checker: ImageUrlChecker) -> Self {
        self.image_checker = Some(checker);
        self
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Runs every field check regardless of `extraction_success`. `normalized` always carries
    /// the corrected copy; `is_valid` decides whether it is accepted.
    pub fn validate_record(
        &self,
        record: &CharacterRecord,
        stats: &mut ValidationStats,
    ) -> ValidationOutcome {
        let strict = self.strict;
        let mut outcome = ValidationOutcome {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            normalized: None,
        };
        let mut normalized = record.clone();

        normalized.name = outcome.absorb("name", fields::validate_name(&record.name, strict));
        normalized.tier = outcome.absorb("tier", fields::validate_tier(&record.tier, strict));
        normalized.cost = outcome.absorb(
            "cost",
            fields::validate_numeric("Cost", record.cost, config::COST_MAX, strict),
        );
        normalized.income = outcome.absorb(
            "income",
            fields::validate_numeric("Income", record.income, config::INCOME_MAX, strict),
        );
        normalized.variant =
            outcome.absorb("variant", fields::validate_variant(&record.variant, strict));

        if let Some(url) = record.image_url.as_deref() {
            normalized.image_url =
                outcome.absorb("image_url", fields::validate_image_url(url, strict));
        }
        if let Some(path) = record.image_path.as_deref() {
            normalized.image_path =
                outcome.absorb("image_path", fields::validate_image_path(path, strict));
        }

        stats.records_validated += 1;
        if normalized.name != record.name {
            stats.names_normalized += 1;
        }
        if normalized.cost != record.cost || normalized.income != record.income {
            stats.numeric_corrections += 1;
        }

        outcome.is_valid = outcome.errors.is_empty();
        outcome.normalized = Some(normalized);
        outcome
    }

    async fn check_image_url(&self, outcome: &mut ValidationOutcome, stats: &mut ValidationStats) {
        let Some(checker) = self.image_checker.as_ref() else {
            return;
        };
        let Some(url) = outcome
            .normalized
            .as_ref()
            .and_then(|r| r.image_url.clone())
        else {
            return;
        };

        stats.image_url_checks += 1;
        let field = match checker.check(&url).await {
            ImageCheck::Reachable => return,
            ImageCheck::Missing => FieldOutcome::clean(None)
                .flag(self.strict, format!("Image URL returned 404: {}", url)),
            ImageCheck::Anomaly(reason) => FieldOutcome::clean(Some(url.clone()))
                .flag(self.strict, format!("Image URL anomaly ({}): {}", reason, url)),
            ImageCheck::Unreachable(reason) => FieldOutcome::clean(Some(url.clone()))
                .warn(format!("Image URL could not be checked ({}): {}", reason, url)),
        };
        let checked = outcome.absorb("image_url", field);
        if let Some(record) = outcome.normalized.as_mut() {
            record.image_url = checked;
        }
        outcome.is_valid = outcome.errors.is_empty();
    }

    /// Validates every record, then detects duplicates over the whole (normalized) batch.
    /// Record errors reject that record only; the batch is invalid when it is empty or holds
    /// exact/exact-name duplicates.
    pub async fn validate_batch(&self, records: &[CharacterRecord]) -> BatchValidation {
        let mut batch = BatchValidation::default();
        if records.is_empty() {
            batch.errors.push("Character list is empty".to_string());
            return batch;
        }

        let mut stats = ValidationStats::default();
        for (index, record) in records.iter().enumerate() {
            let mut outcome = self.validate_record(record, &mut stats);
            self.check_image_url(&mut outcome, &mut stats).await;

            let label = record_label(index, record);
            batch
                .errors
                .extend(outcome.errors.iter().map(|e| format!("{}: {}", label, e)));
            batch
                .warnings
                .extend(outcome.warnings.iter().map(|w| format!("{}: {}", label, w)));
            batch.outcomes.push(outcome);
        }

        let candidates: Vec<CharacterRecord> = batch
            .outcomes
            .iter()
            .zip(records)
            .map(|(o, original)| o.normalized.clone().unwrap_or_else(|| original.clone()))
            .collect();
        batch.duplicates = detect_duplicates(&candidates);
        stats.duplicates_found = batch
            .duplicates
            .iter()
            .map(|g| g.duplicate_indices.len())
            .sum();

        for group in &batch.duplicates {
            let names = group_names(group, &candidates);
            if group.kind.invalidates_batch() {
                batch
                    .errors
                    .push(format!("Exact duplicate characters found: {}", names));
            } else {
                batch.warnings.push(format!(
                    "Similar characters found ({}): {}",
                    group.kind.label(),
                    names
                ));
            }
        }

        batch.is_valid = !batch.has_blocking_duplicates();
        batch.stats = stats;
        batch
    }
}

fn record_label(index: usize, record: &CharacterRecord) -> String {
    let name = record.name.trim();
    if name.is_empty() {
        format!("Record #{}", index + 1)
    } else {
        format!("'{}'", name)
    }
}

fn group_names(group: &DuplicateGroup, records: &[CharacterRecord]) -> String {
    std::iter::once(group.anchor_index)
        .chain(group.duplicate_indices.iter().copied())
        .filter_map(|i| records.get(i))
        .map(|r| r.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
