use crate::config;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Rarity category. Orchestration walks tiers in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Tier {
    Common,
    Rare,
    Epic,
    Legendary,
    Mythic,
    #[serde(rename = "Brainrot God")]
    BrainrotGod,
    Secret,
    #[serde(rename = "OG")]
    Og,
}

/// Legacy tier names folded into the current enumeration.
const TIER_ALIASES: [(&str, Tier); 2] = [("divine", Tier::BrainrotGod), ("celestial", Tier::Secret)];

impl Tier {
    pub const ALL: [Tier; 8] = [
        Tier::Common,
        Tier::Rare,
        Tier::Epic,
        Tier::Legendary,
        Tier::Mythic,
        Tier::BrainrotGod,
        Tier::Secret,
        Tier::Og,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Tier::Common => "Common",
            Tier::Rare => "Rare",
            Tier::Epic => "Epic",
            Tier::Legendary => "Legendary",
            Tier::Mythic => "Mythic",
            Tier::BrainrotGod => "Brainrot God",
            Tier::Secret => "Secret",
            Tier::Og => "OG",
        }
    }

    /// Case-insensitive exact lookup, aliases included.
    pub fn from_name(raw: &str) -> Option<Tier> {
        let key = raw.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }
        lookup_keys().find(|(k, _)| *k == key).map(|(_, tier)| tier)
    }

    /// Substring containment first, then the best edit-distance similarity above the threshold.
    pub fn closest_match(raw: &str) -> Option<Tier> {
        let key = raw.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }

        if let Some((_, tier)) =
            lookup_keys().find(|(k, _)| k.contains(&key) || key.contains(k.as_str()))
        {
            return Some(tier);
        }

        lookup_keys()
            .map(|(k, tier)| (strsim::normalized_levenshtein(&key, &k), tier))
            .filter(|(score, _)| *score >= config::TIER_SIMILARITY_THRESHOLD)
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, tier)| tier)
    }
}

fn lookup_keys() -> impl Iterator<Item = (String, Tier)> {
    Tier::ALL
        .iter()
        .map(|t| (t.display_name().to_lowercase(), *t))
        .chain(TIER_ALIASES.iter().map(|(k, t)| (k.to_string(), *t)))
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Variant {
    #[default]
    Standard,
    Special,
    Limited,
    Exclusive,
}

impl Variant {
    pub const ALL: [Variant; 4] = [
        Variant::Standard,
        Variant::Special,
        Variant::Limited,
        Variant::Exclusive,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Variant::Standard => "Standard",
            Variant::Special => "Special",
            Variant::Limited => "Limited",
            Variant::Exclusive => "Exclusive",
        }
    }

    pub fn from_name(raw: &str) -> Option<Variant> {
        let key = raw.trim();
        Variant::ALL
            .into_iter()
            .find(|v| v.display_name().eq_ignore_ascii_case(key))
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_permutations_map_to_display_casing() {
        for raw in ["brainrot god", "BRAINROT GOD", "Brainrot God", "  bRaInRoT gOd "] {
            assert_eq!(Tier::from_name(raw).map(Tier::display_name), Some("Brainrot God"));
        }
        assert_eq!(Tier::from_name("og"), Some(Tier::Og));
        assert_eq!(Tier::Og.to_string(), "OG");
    }

    #[test]
    fn aliases_fold_into_current_tiers() {
        assert_eq!(Tier::from_name("Divine"), Some(Tier::BrainrotGod));
        assert_eq!(Tier::from_name("CELESTIAL"), Some(Tier::Secret));
    }

    #[test]
    fn closest_match_prefers_containment_then_similarity() {
        assert_eq!(Tier::closest_match("legend"), Some(Tier::Legendary));
        assert_eq!(Tier::closest_match("Mythic tier"), Some(Tier::Mythic));
        assert_eq!(Tier::closest_match("Legandary"), Some(Tier::Legendary));
        assert_eq!(Tier::closest_match("Epik"), Some(Tier::Epic));
        assert_eq!(Tier::closest_match("god"), Some(Tier::BrainrotGod));
        assert_eq!(Tier::closest_match("zzzzzz"), None);
        assert_eq!(Tier::closest_match("   "), None);
    }

    #[test]
    fn variants_are_case_insensitive() {
        assert_eq!(Variant::from_name("limited"), Some(Variant::Limited));
        assert_eq!(Variant::from_name("Shiny"), None);
        assert_eq!(Variant::default().to_string(), "Standard");
    }
}
