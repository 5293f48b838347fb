use crate::config::ScoringWeights;
use crate::error::{AppError, AppResult};
use crate::io;
use crate::logging::{log, LogLevel};
use crate::transform::scoring::ScoredCandidate;
use crate::transform::util::original_image_url;
use crate::transform::{self, PageExtraction};
use crate::utils::run_cpu_intensive;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;

/// What the offline inspection writes: the extracted fields plus the full candidate ranking.
#[derive(Debug, Clone, Serialize)]
pub struct PageInspection {
    pub name: String,
    pub cost: Option<u64>,
    pub income: Option<u64>,
    pub extraction_errors: Vec<String>,
    pub used_fallback_images: bool,
    pub best_image_url: Option<String>,
    pub candidates: Vec<ScoredCandidate>,
}

impl PageInspection {
    fn from_extraction(name: &str, extraction: PageExtraction) -> Self {
        Self {
            name: name.to_string(),
            cost: extraction.fields.cost,
            income: extraction.fields.income,
            best_image_url: extraction
                .best_image()
                .map(|c| original_image_url(&c.candidate.url)),
            extraction_errors: extraction.fields.errors,
            used_fallback_images: extraction.used_fallback_images,
            candidates: extraction.ranked_images,
        }
    }
}

/// Runs extraction and image ranking on a saved HTML page, no network involved.
pub async fn inspect_page(
    input_path: &Path,
    name: &str,
    base_url: &str,
    weights: &ScoringWeights,
    output_path: PathBuf,
) -> AppResult<PageInspection> {
    log(LogLevel::Info, "--- Running Page Inspection ---");
    log(
        LogLevel::Info,
        &format!("Input file: {}", input_path.display()),
    );
    log(
        LogLevel::Info,
        &format!("Output file: {}", output_path.display()),
    );

    let html = fs::read_to_string(input_path)
        .await
        .map_err(|e| AppError::Io(format!("{}: {}", input_path.display(), e)))?;
    if html.trim().is_empty() {
        return Err(AppError::HtmlParseError(format!(
            "Input file is empty: {}",
            input_path.display()
        )));
    }

    let owned_name = name.to_string();
    let base = base_url.to_string();
    let weights = weights.clone();
    let extraction =
        run_cpu_intensive(move || transform::extract_page(&html, &owned_name, &base, &weights))
            .await?;
    let inspection = PageInspection::from_extraction(name, extraction);

    log(
        LogLevel::Info,
        &format!(
            "Cost: {:?} | Income: {:?} | Candidates: {}",
            inspection.cost,
            inspection.income,
            inspection.candidates.len()
        ),
    );
    for error in &inspection.extraction_errors {
        log(LogLevel::Warning, error);
    }
    match &inspection.best_image_url {
        Some(url) => log(LogLevel::Success, &format!("Best image: {}", url)),
        None => log(LogLevel::Warning, "No image candidate survived scoring"),
    }

    io::save_json(
        output_path.clone(),
        inspection.clone(),
        format!("Inspection ({})", name),
    )
    .await?;
    log(
        LogLevel::Success,
        &format!("Saved inspection to {}", output_path.display()),
    );
    Ok(inspection)
}
