use crate::config;
use crate::model::{FieldOutcome, Tier, Variant};
use crate::transform::util::{normalize_whitespace, url_image_extension};
use std::path::{Path, PathBuf};

pub fn validate_name(raw: &str, strict: bool) -> FieldOutcome<String> {
    let mut name = normalize_whitespace(raw);
    let mut outcome = FieldOutcome::clean(String::new());

    if name != raw {
        outcome = outcome.warn("Normalized excessive whitespace in name");
    }

    if config::NAME_INVALID_CHARS_RE.is_match(&name) {
        if strict {
            outcome = outcome.fail("Name contains invalid characters");
        } else {
            let stripped = config::NAME_INVALID_CHARS_RE.replace_all(&name, "");
            name = normalize_whitespace(&stripped);
            outcome = outcome.warn("Removed invalid characters from name");
        }
    }

    let length = name.chars().count();
    if length < config::NAME_MIN_LEN {
        outcome = outcome.fail(format!(
            "Name too short (minimum {} characters)",
            config::NAME_MIN_LEN
        ));
    } else if length > config::NAME_MAX_LEN {
        if strict {
            outcome = outcome.fail(format!(
                "Name too long (maximum {} characters)",
                config::NAME_MAX_LEN
            ));
        } else {
            name = name
                .chars()
                .take(config::NAME_MAX_LEN)
                .collect::<String>()
                .trim_end()
                .to_string();
            outcome = outcome.warn(format!(
                "Truncated name to {} characters",
                config::NAME_MAX_LEN
            ));
        }
    }

    let lower = name.to_lowercase();
    if !name.is_empty() && config::PLACEHOLDER_NAMES.contains(&lower.as_str()) {
        outcome = outcome.warn("Name appears to be a placeholder");
    }
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_digit()) {
        outcome = outcome.warn("Name is purely numeric");
    }

    outcome.value = name;
    outcome
}

/// The corrected name alone. Applying it twice changes nothing.
pub fn normalize_name(raw: &str, strict: bool) -> String {
    validate_name(raw, strict).value
}

pub fn validate_tier(raw: &str, strict: bool) -> FieldOutcome<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return FieldOutcome::clean(String::new()).fail("Tier cannot be empty");
    }
    if let Some(tier) = Tier::from_name(trimmed) {
        return FieldOutcome::clean(tier.display_name().to_string());
    }
    match Tier::closest_match(trimmed) {
        Some(tier) if strict => FieldOutcome::clean(trimmed.to_string()).fail(format!(
            "Invalid tier '{}' (closest match: '{}')",
            trimmed, tier
        )),
        Some(tier) => FieldOutcome::clean(tier.display_name().to_string())
            .warn(format!("Corrected tier '{}' to '{}'", trimmed, tier)),
        None => FieldOutcome::clean(trimmed.to_string())
            .flag(strict, format!("Unknown tier '{}'", trimmed)),
    }
}

/// Clamps to `[0, max]` unless strict. Zero stays valid but is called out.
pub fn validate_numeric(label: &str, value: u64, max: u64, strict: bool) -> FieldOutcome<u64> {
    let mut outcome = FieldOutcome::clean(value);
    if value > max {
        if strict {
            outcome = outcome.fail(format!("{} {} exceeds maximum {}", label, value, max));
        } else {
            outcome.value = max;
            outcome = outcome.warn(format!("Clamped {} from {} to {}", label, value, max));
        }
    }
    if value == 0 {
        outcome = outcome.warn(format!(
            "{} is 0, which may indicate missing data",
            label
        ));
    }
    outcome
}

pub fn validate_variant(raw: &str, strict: bool) -> FieldOutcome<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return FieldOutcome::clean(Variant::default().to_string())
            .warn("Variant missing, defaulting to Standard");
    }
    match Variant::from_name(trimmed) {
        Some(variant) => FieldOutcome::clean(variant.to_string()),
        None => FieldOutcome::clean(trimmed.to_string())
            .flag(strict, format!("Unknown variant '{}'", trimmed)),
    }
}

/// Scheme and extension checks only. Reachability lives in `image_check`.
pub fn validate_image_url(url: &str, strict: bool) -> FieldOutcome<Option<String>> {
    let trimmed = url.trim();
    let lower = trimmed.to_lowercase();
    if !(lower.starts_with("http://") || lower.starts_with("https://")) {
        let outcome = FieldOutcome::clean(None);
        return outcome.flag(strict, format!("Image URL must use http or https: '{}'", trimmed));
    }
    let outcome = FieldOutcome::clean(Some(trimmed.to_string()));
    if url_image_extension(trimmed).is_none() {
        return outcome.flag(strict, "Image URL does not have a recognized image extension");
    }
    outcome
}

/// A missing file only warns. A directory or empty file is an anomaly.
pub fn validate_image_path(path: &Path, strict: bool) -> FieldOutcome<Option<PathBuf>> {
    let kept = FieldOutcome::clean(Some(path.to_path_buf()));
    match std::fs::metadata(path) {
        Err(_) => kept.warn(format!("Image file not found: {}", path.display())),
        Ok(meta) if meta.is_dir() => FieldOutcome::clean(None).flag(
            strict,
            format!("Image path is a directory: {}", path.display()),
        ),
        Ok(meta) if meta.len() == 0 => FieldOutcome::clean(None)
            .flag(strict, format!("Image file is empty: {}", path.display())),
        Ok(_) => kept,
    }
}
