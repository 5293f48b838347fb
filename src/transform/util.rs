use crate::config;
use reqwest::Url;

#[inline]
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercased with spaces, underscores and hyphens removed. Used for filename/name comparisons.
pub fn compact_key(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Lowercased words longer than two characters.
pub fn significant_words(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|w| w.chars().count() > 2)
        .map(str::to_lowercase)
        .collect()
}

pub fn absolutize_url(base_url: &str, raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with("data:") {
        return None;
    }
    if let Some(rest) = raw.strip_prefix("//") {
        return Some(format!("https://{}", rest));
    }
    if raw.starts_with("http://") || raw.starts_with("https://") {
        return Some(raw.to_string());
    }
    Url::parse(base_url)
        .and_then(|base| base.join(raw))
        .ok()
        .map(|u| u.to_string())
}

pub fn url_host(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
}

pub fn is_asset_host(url: &str) -> bool {
    url_host(url).is_some_and(|h| config::ASSET_HOSTS.iter().any(|a| h == *a))
}

/// Dedup key: the URL without its revision/thumbnail tail or query.
pub fn canonical_image_key(url: &str) -> String {
    let without_revision = url.split("/revision/").next().unwrap_or(url);
    without_revision
        .split('?')
        .next()
        .unwrap_or(without_revision)
        .to_string()
}

/// Full-size asset URL for a thumbnail: scale segments dropped, revision pinned to `latest`.
pub fn original_image_url(url: &str) -> String {
    let unscaled = config::SCALE_SUFFIX_RE.replace_all(url, "");
    config::REVISION_RE
        .replace(&unscaled, "/revision/latest")
        .into_owned()
}

/// The decoded path segment carrying a recognized image extension, e.g. `Fluriflura.png`.
pub fn image_filename(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segments: Vec<String> = parsed
        .path_segments()?
        .map(|s| {
            urlencoding::decode(s)
                .map(|d| d.into_owned())
                .unwrap_or_else(|_| s.to_string())
        })
        .collect();
    segments
        .into_iter()
        .rev()
        .find(|seg| image_extension_of(seg).is_some())
}

pub fn image_extension_of(filename: &str) -> Option<&'static str> {
    let lower = filename.to_lowercase();
    config::RECOGNIZED_IMAGE_EXTENSIONS
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .copied()
}

pub fn url_image_extension(url: &str) -> Option<&'static str> {
    image_filename(url).and_then(|f| image_extension_of(&f))
}

pub fn is_skipped_wiki_link(href: &str) -> bool {
    let lower = href.to_lowercase();
    if !lower.contains("/wiki/") {
        return true;
    }
    let page = lower.rsplit("/wiki/").next().unwrap_or("");
    config::SKIP_LINK_NAMESPACES
        .iter()
        .any(|ns| page.starts_with(ns))
        || config::SKIP_LINK_PAGES
            .iter()
            .any(|p| page.split(['#', '?']).next() == Some(*p))
}

#[cfg(test)]
mod tests {
    use super::*;

    const THUMB: &str = "https://static.wikia.nocookie.net/stealabrainrot/images/7/77/Fluriflura.png/revision/latest/scale-to-width-down/268?cb=20250601";

    #[test]
    fn thumbnail_is_rewritten_to_original() {
        assert_eq!(
            original_image_url(THUMB),
            "https://static.wikia.nocookie.net/stealabrainrot/images/7/77/Fluriflura.png/revision/latest?cb=20250601"
        );
    }

    #[test]
    fn canonical_key_strips_revision_and_query() {
        assert_eq!(
            canonical_image_key(THUMB),
            "https://static.wikia.nocookie.net/stealabrainrot/images/7/77/Fluriflura.png"
        );
    }

    #[test]
    fn filename_found_before_revision_tail() {
        assert_eq!(image_filename(THUMB).as_deref(), Some("Fluriflura.png"));
        assert_eq!(url_image_extension(THUMB), Some(".png"));
        assert!(is_asset_host(THUMB));
        assert_eq!(url_image_extension("https://wiki.test/wiki/Fluriflura"), None);
    }

    #[test]
    fn relative_and_protocol_relative_urls_resolve() {
        assert_eq!(
            absolutize_url("https://wiki.test", "/wiki/Tim_Cheese").as_deref(),
            Some("https://wiki.test/wiki/Tim_Cheese")
        );
        assert_eq!(
            absolutize_url("https://wiki.test", "//static.wikia.nocookie.net/a.png").as_deref(),
            Some("https://static.wikia.nocookie.net/a.png")
        );
        assert_eq!(absolutize_url("https://wiki.test", "data:image/gif;base64,R0l"), None);
    }

    #[test]
    fn namespace_links_are_skipped() {
        assert!(is_skipped_wiki_link("/wiki/Category:Common"));
        assert!(is_skipped_wiki_link("/wiki/Special:Search?query=x"));
        assert!(is_skipped_wiki_link("/wiki/Brainrots"));
        assert!(is_skipped_wiki_link("https://elsewhere.test/page"));
        assert!(!is_skipped_wiki_link("/wiki/Tim_Cheese"));
    }

    #[test]
    fn compact_key_ignores_separators() {
        assert_eq!(compact_key("Tung Tung_Sahur-x"), "tungtungsahurx");
        assert_eq!(significant_words("La Vacca Saturno"), vec!["vacca", "saturno"]);
    }
}
