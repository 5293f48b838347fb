use crate::api::client::WikiClient;
use crate::api::fetchers;
use crate::config::BuilderConfig;
use crate::core::images::ImageDownloader;
use crate::core::locator::PageLocator;
use crate::error::{AppError, AppResult};
use crate::logging::{log, LogLevel};
use crate::model::{CharacterRecord, Tier};
use crate::transform::util::original_image_url;
use crate::transform::{self, PageExtraction};
use crate::utils::run_cpu_intensive;
use chrono::Utc;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageStatus {
    NotAttempted,
    Downloaded,
    Reused,
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct CharacterOutcome {
    pub tier: Tier,
    pub record: CharacterRecord,
    pub image: ImageStatus,
}

/// The shared pieces one character run needs. Cheap to clone into worker futures.
#[derive(Clone)]
pub struct CharacterPipeline {
    config: Arc<BuilderConfig>,
    client: WikiClient,
    locator: PageLocator,
    downloader: ImageDownloader,
}

impl CharacterPipeline {
    pub fn new(
        config: Arc<BuilderConfig>,
        client: WikiClient,
        locator: PageLocator,
        downloader: ImageDownloader,
    ) -> Self {
        Self {
            config,
            client,
            locator,
            downloader,
        }
    }

    /// Locate, fetch, extract and optionally download the portrait for one character.
    /// An `Err` means no record could be produced; missing fields and image failures
    /// stay on the record as extraction errors.
    pub async fn process_character(&self, tier: Tier, name: &str) -> AppResult<CharacterOutcome> {
        if self.client.cancel_token().is_cancelled() {
            return Err(AppError::Cancelled(name.to_string()));
        }

        let page_url = self.locator.resolve(name).await?;
        let html = fetchers::fetch_page_html(&self.client, &page_url).await?;

        let owned_name = name.to_string();
        let base_url = self.config.base_url.clone();
        let weights = self.config.scoring.clone();
        let extraction: PageExtraction = run_cpu_intensive(move || {
            transform::extract_page(&html, &owned_name, &base_url, &weights)
        })
        .await?;

        let fields = &extraction.fields;
        let mut record = CharacterRecord::new(
            name,
            tier.display_name(),
            fields.cost.unwrap_or(0),
            fields.income.unwrap_or(0),
        )?
        .with_wiki_url(page_url.as_str());
        for error in &fields.errors {
            record.push_error(error.clone());
        }
        if extraction.used_fallback_images {
            log(
                LogLevel::Debug,
                &format!("No infobox portrait for '{}', used page-wide images", name),
            );
        }

        let best = extraction.best_image();
        if let Some(best) = best {
            record = record.with_image_url(original_image_url(&best.candidate.url));
        }

        let image = if !self.config.download_images {
            ImageStatus::NotAttempted
        } else if best.is_none() {
            record.push_error("No suitable image found on character page");
            ImageStatus::Failed("no candidates".to_string())
        } else {
            match self
                .downloader
                .download_best(name, &extraction.ranked_images)
                .await
            {
                Ok(downloaded) => {
                    let status = if downloaded.reused {
                        ImageStatus::Reused
                    } else {
                        ImageStatus::Downloaded
                    };
                    record = record.with_image_path(downloaded.path);
                    status
                }
                Err(e @ AppError::Cancelled(_)) => return Err(e),
                Err(e) => {
                    log(
                        LogLevel::Warning,
                        &format!("Image download failed for '{}': {}", name, e),
                    );
                    record.push_error(format!("Image download failed: {}", e));
                    ImageStatus::Failed(e.to_string())
                }
            }
        };

        Ok(CharacterOutcome {
            tier,
            record: record.stamped(Utc::now()),
            image,
        })
    }
}
