use crate::transform::util::{absolutize_url, canonical_image_key, is_asset_host, url_image_extension};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

static PRIMARY_FIGURE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r#"figure[data-source="image1"]"#).expect("Invalid primary figure selector")
});
static INFOBOX_FIGURE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("figure.pi-item.pi-image").expect("Invalid infobox figure selector")
});
static HERO_FIGURE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("figure.pi-hero").expect("Invalid hero figure selector"));
static IMG_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img").expect("Invalid img selector"));

/// Where a candidate was found. Declaration order is slot priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CandidateSource {
    PrimarySlot,
    InfoboxImage,
    HeroImage,
    DataAttribute,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageCandidate {
    pub url: String,
    pub source: CandidateSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub discovery_index: usize,
}

#[derive(Default)]
struct CandidateCollector {
    seen: HashSet<String>,
    candidates: Vec<ImageCandidate>,
}

impl CandidateCollector {
    fn push(&mut self, url: String, source: CandidateSource, img: Option<ElementRef<'_>>) {
        if !self.seen.insert(canonical_image_key(&url)) {
            return;
        }
        let attr = |name: &str| {
            img.and_then(|el| el.value().attr(name))
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let discovery_index = self.candidates.len();
        self.candidates.push(ImageCandidate {
            alt: attr("alt"),
            title: attr("title").or_else(|| attr("data-image-name")),
            url,
            source,
            discovery_index,
        });
    }
}

/// Lazy-loaded images carry a data: placeholder in `src` and the real URL in `data-src`.
fn img_source(img: ElementRef<'_>, base_url: &str) -> Option<String> {
    let value = img.value();
    let src = value.attr("src").filter(|s| !s.trim_start().starts_with("data:"));
    src.or_else(|| value.attr("data-src"))
        .and_then(|raw| absolutize_url(base_url, raw))
}

/// Direct URL from a figure's JSON `data-attrs` blob.
fn data_attrs_url(figure: ElementRef<'_>, base_url: &str) -> Option<String> {
    let raw = figure.value().attr("data-attrs")?;
    let parsed: Value = serde_json::from_str(raw)
        .or_else(|_| serde_json::from_str(&raw.replace("&quot;", "\"")))
        .ok()?;
    parsed
        .get("url")
        .and_then(Value::as_str)
        .and_then(|u| absolutize_url(base_url, u))
}

/// Images in the infobox figures, primary slot first, then generic infobox items, then hero images.
pub fn discover_infobox_candidates(doc: &Html, base_url: &str) -> Vec<ImageCandidate> {
    let slots: [(&Selector, CandidateSource); 3] = [
        (&PRIMARY_FIGURE_SELECTOR, CandidateSource::PrimarySlot),
        (&INFOBOX_FIGURE_SELECTOR, CandidateSource::InfoboxImage),
        (&HERO_FIGURE_SELECTOR, CandidateSource::HeroImage),
    ];

    let mut collector = CandidateCollector::default();
    let mut visited_figures = HashSet::new();

    for (selector, source) in slots {
        for figure in doc.select(selector) {
            if !visited_figures.insert(figure.id()) {
                continue;
            }
            let mut found_img = false;
            for img in figure.select(&IMG_SELECTOR) {
                if let Some(url) = img_source(img, base_url) {
                    found_img = true;
                    collector.push(url, source, Some(img));
                }
            }
            if !found_img {
                if let Some(url) = data_attrs_url(figure, base_url) {
                    collector.push(url, CandidateSource::DataAttribute, None);
                }
            }
        }
    }

    collector.candidates
}

/// Every image on the page served from the wiki's asset CDN with an image extension.
pub fn discover_fallback_candidates(doc: &Html, base_url: &str) -> Vec<ImageCandidate> {
    let mut collector = CandidateCollector::default();
    for img in doc.select(&IMG_SELECTOR) {
        let Some(url) = img_source(img, base_url) else {
            continue;
        };
        if is_asset_host(&url) && url_image_extension(&url).is_some() {
            collector.push(url, CandidateSource::Fallback, Some(img));
        }
    }
    collector.candidates
}
