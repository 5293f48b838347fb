pub mod images;
pub mod infobox;
pub mod locator;
pub mod numeric;
pub mod roster;
pub mod scoring;
pub mod util;

use crate::config::ScoringWeights;
use crate::transform::images::{discover_fallback_candidates, discover_infobox_candidates};
use crate::transform::infobox::InfoboxFields;
use crate::transform::scoring::{rank_candidates, ScoredCandidate};
use scraper::Html;
use serde::Serialize;

/// Everything pulled out of one character page. Owned, so it can leave the parsing thread.
#[derive(Debug, Clone, Serialize)]
pub struct PageExtraction {
    pub fields: InfoboxFields,
    pub ranked_images: Vec<ScoredCandidate>,
    pub used_fallback_images: bool,
}

impl PageExtraction {
    pub fn best_image(&self) -> Option<&ScoredCandidate> {
        self.ranked_images.first()
    }
}

/// Parses a character page: infobox fields plus ranked portrait candidates.
/// The page-wide image scan only runs when no infobox candidate survives scoring.
pub fn extract_page(
    html: &str,
    character_name: &str,
    base_url: &str,
    weights: &ScoringWeights,
) -> PageExtraction {
    let doc = Html::parse_document(html);
    let fields = infobox::extract_fields(&doc);

    let infobox_candidates = discover_infobox_candidates(&doc, base_url);
    let ranked = rank_candidates(&infobox_candidates, character_name, weights);
    if !ranked.is_empty() {
        return PageExtraction {
            fields,
            ranked_images: ranked,
            used_fallback_images: false,
        };
    }

    let fallback = discover_fallback_candidates(&doc, base_url);
    PageExtraction {
        fields,
        ranked_images: rank_candidates(&fallback, character_name, weights),
        used_fallback_images: true,
    }
}
