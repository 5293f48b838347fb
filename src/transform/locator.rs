use crate::transform::util::{absolutize_url, is_skipped_wiki_link, normalize_whitespace};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};

static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("Invalid link selector"));

fn title_case(name: &str) -> String {
    name.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn page_url(base_url: &str, title: &str) -> String {
    format!(
        "{}/wiki/{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(title)
    )
}

/// Candidate page URLs in probe order: underscores in original case, lowercase, title case,
/// then the name with percent-encoded spaces. Duplicates are dropped.
pub fn url_variations(base_url: &str, name: &str) -> Vec<String> {
    let name = normalize_whitespace(name);
    if name.is_empty() {
        return Vec::new();
    }
    let underscored = name.replace(' ', "_");

    let titles = [
        underscored.clone(),
        underscored.to_lowercase(),
        title_case(&name).replace(' ', "_"),
        name.clone(),
    ];

    let mut urls: Vec<String> = Vec::with_capacity(titles.len());
    for title in titles {
        let url = page_url(base_url, &title);
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    urls
}

/// First search result link whose text contains the name, case-insensitively.
/// Namespaced pages (Special:, File:, ...) never match.
pub fn find_search_match(html: &str, name: &str, base_url: &str) -> Option<String> {
    let needle = normalize_whitespace(name).to_lowercase();
    if needle.is_empty() {
        return None;
    }
    let doc = Html::parse_document(html);
    doc.select(&LINK_SELECTOR).find_map(|link| {
        let href = link.value().attr("href")?;
        if is_skipped_wiki_link(href) {
            return None;
        }
        let text = normalize_whitespace(&link.text().collect::<String>()).to_lowercase();
        if text.contains(&needle) {
            absolutize_url(base_url, href)
        } else {
            None
        }
    })
}
