use crate::config;
use crate::model::{CharacterRecord, DuplicateGroup, DuplicateKind};
use crate::transform::util::normalize_whitespace;
use std::collections::HashSet;

fn name_key(name: &str) -> String {
    normalize_whitespace(name).to_lowercase()
}

/// `1 - levenshtein(a, b) / max(len(a), len(b))` over lowercased, trimmed names.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(&a.trim().to_lowercase(), &b.trim().to_lowercase())
}

fn same_stats(a: &CharacterRecord, b: &CharacterRecord) -> bool {
    a.tier.eq_ignore_ascii_case(&b.tier) && a.cost == b.cost && a.income == b.income
}

/// Classifies a single pair, or `None` when the two records are unrelated.
pub fn classify_pair(a: &CharacterRecord, b: &CharacterRecord) -> Option<(DuplicateKind, f64)> {
    if name_key(&a.name) == name_key(&b.name) {
        let kind = if same_stats(a, b) && a.variant.eq_ignore_ascii_case(&b.variant) {
            DuplicateKind::Exact
        } else {
            DuplicateKind::ExactName
        };
        return Some((kind, 1.0));
    }

    let similarity = name_similarity(&a.name, &b.name);
    if similarity >= config::SIMILAR_NAME_THRESHOLD {
        Some((DuplicateKind::SimilarName, similarity))
    } else if similarity >= config::SAME_STATS_NAME_THRESHOLD && same_stats(a, b) {
        Some((DuplicateKind::SameStatsDifferentName, similarity))
    } else {
        None
    }
}

/// Single pass over all pairs. A record that joins a group is never re-flagged as an anchor
/// or as a member of a later group. The group kind is the most severe kind among its pairs
/// and the similarity is the weakest pair's.
pub fn detect_duplicates(records: &[CharacterRecord]) -> Vec<DuplicateGroup> {
    let mut processed: HashSet<usize> = HashSet::new();
    let mut groups = Vec::new();

    for (i, anchor) in records.iter().enumerate() {
        if processed.contains(&i) {
            continue;
        }

        let mut members = Vec::new();
        let mut kind: Option<DuplicateKind> = None;
        let mut similarity = 1.0_f64;

        for (j, other) in records.iter().enumerate().skip(i + 1) {
            if processed.contains(&j) {
                continue;
            }
            if let Some((pair_kind, pair_similarity)) = classify_pair(anchor, other) {
                members.push(j);
                processed.insert(j);
                kind = Some(kind.map_or(pair_kind, |k| k.min(pair_kind)));
                similarity = similarity.min(pair_similarity);
            }
        }

        if let Some(kind) = kind {
            processed.insert(i);
            groups.push(DuplicateGroup {
                anchor_index: i,
                duplicate_indices: members,
                similarity,
                kind,
            });
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::record::RecordFixture;

    #[test]
    fn similarity_matches_edit_distance_formula() {
        let sim = name_similarity("Bombardiro Crocodilo", "Bombardiro Crocodila");
        assert!((sim - 0.95).abs() < 1e-9);
        assert_eq!(name_similarity(" TIM ", "tim"), 1.0);
    }

    #[test]
    fn identical_names_always_group() {
        let a = RecordFixture::named("Tung Tung Sahur").cost(10).build();
        let b = RecordFixture::named("tung  tung sahur").cost(10).build();
        let c = RecordFixture::named("TUNG TUNG SAHUR").cost(99).build();

        assert_eq!(classify_pair(&a, &b).map(|p| p.0), Some(DuplicateKind::Exact));
        assert_eq!(classify_pair(&a, &c).map(|p| p.0), Some(DuplicateKind::ExactName));
    }

    #[test]
    fn near_names_with_different_stats_are_similar_not_exact() {
        let records = vec![
            RecordFixture::named("Bombardiro Crocodilo").cost(500).income(5).build(),
            RecordFixture::named("Bombardiro Crocodila").cost(900).income(7).build(),
        ];
        let groups = detect_duplicates(&records);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].kind, DuplicateKind::SimilarName);
        assert_eq!(groups[0].duplicate_indices, vec![1]);
        assert!(!groups[0].kind.invalidates_batch());
    }

    #[test]
    fn same_stats_needs_moderate_name_similarity() {
        let a = RecordFixture::named("Trippi Troppi").tier("Rare").cost(50).income(2).build();
        let b = RecordFixture::named("Trippa Troppa").tier("Rare").cost(50).income(2).build();
        let c = RecordFixture::named("Fluriflura").tier("Rare").cost(50).income(2).build();

        let (kind, sim) = classify_pair(&a, &b).unwrap();
        assert_eq!(kind, DuplicateKind::SameStatsDifferentName);
        assert!(sim >= 0.7 && sim < 0.9);
        assert_eq!(classify_pair(&a, &c), None);
    }

    #[test]
    fn grouped_records_are_not_reflagged() {
        let records = vec![
            RecordFixture::named("Tim Cheese").build(),
            RecordFixture::named("Fluriflura").build(),
            RecordFixture::named("tim cheese").build(),
            RecordFixture::named("Tim Cheese").cost(7).build(),
        ];
        let groups = detect_duplicates(&records);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].anchor_index, 0);
        assert_eq!(groups[0].duplicate_indices, vec![2, 3]);
        assert_eq!(groups[0].kind, DuplicateKind::Exact);
    }

    #[test]
    fn unrelated_records_produce_no_groups() {
        let records = vec![
            RecordFixture::named("Tim Cheese").build(),
            RecordFixture::named("Fluriflura").build(),
        ];
        assert!(detect_duplicates(&records).is_empty());
    }
}
