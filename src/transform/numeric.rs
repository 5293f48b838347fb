use crate::config;

/// First number embedded in free text, with thousands separators removed and a
/// trailing `k`/`m`/`b` multiplier applied. Currency symbols and surrounding words are ignored.
pub fn parse_numeric(text: &str) -> Option<u64> {
    for caps in config::NUMBER_RE.captures_iter(text) {
        let Some(digits) = caps.get(1) else {
            continue;
        };
        let cleaned = digits.as_str().trim_end_matches(',').replace(',', "");
        let Ok(base) = cleaned.parse::<f64>() else {
            continue;
        };

        let multiplier = caps
            .get(2)
            .filter(|suffix| !text[suffix.end()..].starts_with(|c: char| c.is_alphabetic()))
            .map(|suffix| suffix_multiplier(suffix.as_str()))
            .unwrap_or(1.0);

        let value = (base * multiplier).round();
        if value.is_finite() && value >= 0.0 && value <= u64::MAX as f64 {
            return Some(value as u64);
        }
    }
    None
}

fn suffix_multiplier(suffix: &str) -> f64 {
    match suffix.to_ascii_lowercase().as_str() {
        "k" => 1_000.0,
        "m" => 1_000_000.0,
        "b" => 1_000_000_000.0,
        _ => 1.0,
    }
}
