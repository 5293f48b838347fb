use crate::config::{self, ScoringWeights};
use crate::transform::images::{CandidateSource, ImageCandidate};
use crate::transform::util::{
    compact_key, image_filename, is_asset_host, significant_words, url_host, url_image_extension,
};
use serde::Serialize;

/// Everything a rule may look at, computed once per candidate.
#[derive(Debug, Clone)]
pub struct CandidateContext<'a> {
    pub candidate: &'a ImageCandidate,
    pub url_lower: String,
    pub filename_key: String,
    pub filename_tokens: Vec<String>,
    pub name_lower: String,
    pub name_key: String,
    pub name_words: Vec<String>,
    pub alt_lower: String,
    pub title_lower: String,
}

impl<'a> CandidateContext<'a> {
    pub fn new(candidate: &'a ImageCandidate, character_name: &str) -> Self {
        let filename = image_filename(&candidate.url).unwrap_or_default();
        let stem = match filename.rfind('.') {
            Some(dot) => &filename[..dot],
            None => filename.as_str(),
        };
        let filename_tokens = stem
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
            .collect();

        Self {
            candidate,
            url_lower: candidate.url.to_lowercase(),
            filename_key: compact_key(stem),
            filename_tokens,
            name_lower: character_name.trim().to_lowercase(),
            name_key: compact_key(character_name),
            name_words: significant_words(character_name),
            alt_lower: candidate.alt.as_deref().unwrap_or_default().to_lowercase(),
            title_lower: candidate.title.as_deref().unwrap_or_default().to_lowercase(),
        }
    }

    fn name_word_fraction(&self) -> f64 {
        if self.name_words.is_empty() {
            return 0.0;
        }
        let hits = self
            .name_words
            .iter()
            .filter(|w| self.filename_key.contains(w.as_str()))
            .count();
        hits as f64 / self.name_words.len() as f64
    }

    /// Tokens from `list` present in the filename, ignoring tokens that belong to the name itself.
    fn foreign_token_count(&self, list: &[&str]) -> f64 {
        self.filename_tokens
            .iter()
            .filter(|t| list.contains(&t.as_str()))
            .filter(|t| !self.name_lower.split_whitespace().any(|w| w == t.as_str()))
            .count() as f64
    }
}

/// One scoring rule: `strength` in [0, n] scales `weight`. Booleans use 0 or 1,
/// proportional rules a fraction, penalties a count.
pub struct ScoreRule {
    pub name: &'static str,
    pub weight: fn(&ScoringWeights) -> i64,
    pub strength: fn(&CandidateContext<'_>) -> f64,
}

fn flag(hit: bool) -> f64 {
    if hit {
        1.0
    } else {
        0.0
    }
}

pub static SCORE_RULES: [ScoreRule; 15] = [
    ScoreRule {
        name: "primary_slot",
        weight: |w| w.primary_slot,
        strength: |c| flag(c.candidate.source == CandidateSource::PrimarySlot),
    },
    ScoreRule {
        name: "infobox_slot",
        weight: |w| w.infobox_slot,
        strength: |c| flag(c.candidate.source == CandidateSource::InfoboxImage),
    },
    ScoreRule {
        name: "hero_slot",
        weight: |w| w.hero_slot,
        strength: |c| flag(c.candidate.source == CandidateSource::HeroImage),
    },
    ScoreRule {
        name: "data_attribute",
        weight: |w| w.data_attribute,
        strength: |c| flag(c.candidate.source == CandidateSource::DataAttribute),
    },
    ScoreRule {
        name: "fallback",
        weight: |w| w.fallback,
        strength: |c| flag(c.candidate.source == CandidateSource::Fallback),
    },
    ScoreRule {
        name: "exact_filename",
        weight: |w| w.exact_filename,
        strength: |c| flag(!c.name_key.is_empty() && c.filename_key == c.name_key),
    },
    ScoreRule {
        name: "filename_prefix",
        weight: |w| w.filename_prefix,
        strength: |c| {
            flag(
                !c.name_key.is_empty()
                    && c.filename_key != c.name_key
                    && c.filename_key.starts_with(&c.name_key),
            )
        },
    },
    ScoreRule {
        name: "filename_contains",
        weight: |w| w.filename_contains,
        strength: |c| {
            flag(
                !c.name_key.is_empty()
                    && !c.filename_key.starts_with(&c.name_key)
                    && c.filename_key.contains(&c.name_key),
            )
        },
    },
    ScoreRule {
        name: "name_word_fraction",
        weight: |w| w.name_word_fraction,
        strength: |c| c.name_word_fraction(),
    },
    ScoreRule {
        name: "all_name_words",
        weight: |w| w.all_name_words,
        strength: |c| flag(c.name_word_fraction() >= 1.0),
    },
    ScoreRule {
        name: "alt_text",
        weight: |w| w.alt_text,
        strength: |c| flag(!c.name_lower.is_empty() && c.alt_lower.contains(&c.name_lower)),
    },
    ScoreRule {
        name: "title_text",
        weight: |w| w.title_text,
        strength: |c| flag(!c.name_lower.is_empty() && c.title_lower.contains(&c.name_lower)),
    },
    ScoreRule {
        name: "asset_cdn",
        weight: |w| w.asset_cdn,
        strength: |c| {
            flag(is_asset_host(&c.candidate.url) && url_image_extension(&c.candidate.url).is_some())
        },
    },
    ScoreRule {
        name: "variant_token",
        weight: |w| w.variant_penalty,
        strength: |c| c.foreign_token_count(&config::VARIANT_TOKENS),
    },
    ScoreRule {
        name: "group_token",
        weight: |w| w.group_penalty,
        strength: |c| c.foreign_token_count(&config::GROUP_TOKENS),
    },
];

/// Exclusion-list hits zero the score. Collision tokens only count when absent from the name.
pub fn is_disqualified(ctx: &CandidateContext<'_>) -> bool {
    if config::EXCLUDED_IMAGE_TOKENS
        .iter()
        .any(|t| ctx.url_lower.contains(t))
    {
        return true;
    }
    if config::NAME_COLLISION_TOKENS
        .iter()
        .any(|t| ctx.url_lower.contains(t) && !ctx.name_lower.contains(t))
    {
        return true;
    }
    url_host(&ctx.candidate.url).is_some_and(|h| config::FOREIGN_IMAGE_HOSTS.contains(&h.as_str()))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCandidate {
    pub candidate: ImageCandidate,
    pub score: i64,
    pub matched_rules: Vec<&'static str>,
}

pub fn score_candidate(
    candidate: &ImageCandidate,
    character_name: &str,
    weights: &ScoringWeights,
) -> ScoredCandidate {
    let ctx = CandidateContext::new(candidate, character_name);
    if is_disqualified(&ctx) {
        return ScoredCandidate {
            candidate: candidate.clone(),
            score: 0,
            matched_rules: vec!["disqualified"],
        };
    }

    let mut total = 0i64;
    let mut matched_rules = Vec::new();
    for rule in SCORE_RULES.iter() {
        let strength = (rule.strength)(&ctx);
        if strength == 0.0 {
            continue;
        }
        let contribution = ((rule.weight)(weights) as f64 * strength).round() as i64;
        if contribution != 0 {
            matched_rules.push(rule.name);
            total += contribution;
        }
    }

    ScoredCandidate {
        candidate: candidate.clone(),
        score: total.max(0),
        matched_rules,
    }
}

/// Scores, drops zero scores and sorts descending. The sort is stable, so ties keep discovery order.
pub fn rank_candidates(
    candidates: &[ImageCandidate],
    character_name: &str,
    weights: &ScoringWeights,
) -> Vec<ScoredCandidate> {
    let mut scored: Vec<ScoredCandidate> = candidates
        .iter()
        .map(|c| score_candidate(c, character_name, weights))
        .filter(|s| s.score > 0)
        .collect();
    scored.sort_by(|a, b| b.score.cmp(&a.score));
    scored
}
