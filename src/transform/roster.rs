use crate::error::{AppError, AppResult};
use crate::model::Tier;
use crate::transform::util::{is_skipped_wiki_link, normalize_whitespace};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static TABBER_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.tabber.wds-tabber").expect("Invalid tabber selector"));
static TAB_CONTENT_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.wds-tab__content").expect("Invalid tab content selector"));
static HEADING_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").expect("Invalid heading selector"));
static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("Invalid link selector"));

/// Tier → character names, walked in tier order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    tiers: BTreeMap<Tier, Vec<String>>,
}

impl Roster {
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Tier, Vec<S>)>,
        S: Into<String>,
    {
        let mut roster = Roster::default();
        for (tier, names) in pairs {
            for name in names {
                roster.push(tier, name.into());
            }
        }
        roster
    }

    /// JSON object keyed by tier name (case-insensitive, aliases allowed).
    pub fn from_json(json: &str) -> AppResult<Self> {
        let raw: BTreeMap<String, Vec<String>> = serde_json::from_str(json)?;
        let mut roster = Roster::default();
        for (tier_name, names) in raw {
            let tier = Tier::from_name(&tier_name).ok_or_else(|| {
                AppError::Argument(format!("Unknown tier '{}' in roster file", tier_name))
            })?;
            for name in names {
                roster.push(tier, name);
            }
        }
        if roster.is_empty() {
            return Err(AppError::Argument("Roster contains no character names".into()));
        }
        Ok(roster)
    }

    pub fn push(&mut self, tier: Tier, name: String) {
        let name = normalize_whitespace(&name);
        if name.is_empty() {
            return;
        }
        let names = self.tiers.entry(tier).or_default();
        if !names.contains(&name) {
            names.push(name);
        }
    }

    pub fn names(&self, tier: Tier) -> &[String] {
        self.tiers.get(&tier).map(Vec::as_slice).unwrap_or(&[])
    }

    /// (tier, name) pairs in tier order, then listing order within the tier.
    pub fn entries(&self) -> Vec<(Tier, String)> {
        Tier::ALL
            .iter()
            .flat_map(|tier| self.names(*tier).iter().map(move |n| (*tier, n.clone())))
            .collect()
    }

    pub fn total(&self) -> usize {
        self.tiers.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn tiers(&self) -> impl Iterator<Item = Tier> + '_ {
        Tier::ALL.into_iter().filter(|t| !self.names(*t).is_empty())
    }
}

fn find_tier_panel<'a>(tabber: ElementRef<'a>, tier: Tier) -> Option<ElementRef<'a>> {
    let label = tier.display_name();
    let attr_selectors = [
        format!(r#"[data-tab-name="{}"]"#, label),
        format!(r#"[data-tab="{}"]"#, label),
        format!(r#"div[title="{}"]"#, label),
    ];
    for raw in attr_selectors.iter() {
        if let Ok(sel) = Selector::parse(raw) {
            if let Some(panel) = tabber.select(&sel).next() {
                return Some(panel);
            }
        }
    }

    let needle = label.to_lowercase();
    tabber.select(&TAB_CONTENT_SELECTOR).find(|panel| {
        panel.select(&HEADING_SELECTOR).any(|h| {
            h.text()
                .collect::<String>()
                .to_lowercase()
                .contains(&needle)
        })
    })
}

fn panel_character_names(panel: ElementRef<'_>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for link in panel.select(&LINK_SELECTOR) {
        let href = link.value().attr("href").unwrap_or_default();
        let text = normalize_whitespace(&link.text().collect::<String>());
        if text.is_empty() || is_skipped_wiki_link(href) {
            continue;
        }
        if !names.contains(&text) {
            names.push(text);
        }
    }
    names
}

/// Parses the wiki's tabbed roster page. Tiers without a panel are skipped.
pub fn parse_roster_page(html: &str) -> AppResult<Roster> {
    let doc = Html::parse_document(html);
    let tabber = doc.select(&TABBER_SELECTOR).next().ok_or_else(|| {
        AppError::HtmlParseError("Could not find tabber section on roster page".into())
    })?;

    let mut roster = Roster::default();
    for tier in Tier::ALL {
        if let Some(panel) = find_tier_panel(tabber, tier) {
            for name in panel_character_names(panel) {
                roster.push(tier, name);
            }
        }
    }

    if roster.is_empty() {
        return Err(AppError::HtmlParseError(
            "No character names found in any tier".into(),
        ));
    }
    Ok(roster)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tabber_panels() {
        let html = r#"
        <div class="tabber wds-tabber">
          <div class="wds-tab__content" data-tab-name="Common">
            <ul>
              <li><a href="/wiki/Noobini_Pizzanini">Noobini Pizzanini</a></li>
              <li><a href="/wiki/Tim_Cheese">Tim Cheese</a></li>
              <li><a href="/wiki/Tim_Cheese">Tim Cheese</a></li>
              <li><a href="/wiki/Category:Common">Common</a></li>
              <li><a href="/wiki/File:Icon.png">icon</a></li>
            </ul>
          </div>
          <div class="wds-tab__content">
            <h3>Brainrot God tier</h3>
            <a href="/wiki/Cocofanto_Elefanto">Cocofanto Elefanto</a>
            <a href="/wiki/Brainrots">Back</a>
          </div>
        </div>"#;
        let roster = parse_roster_page(html).unwrap();
        assert_eq!(roster.names(Tier::Common), ["Noobini Pizzanini", "Tim Cheese"]);
        assert_eq!(roster.names(Tier::BrainrotGod), ["Cocofanto Elefanto"]);
        assert_eq!(roster.total(), 3);
    }

    #[test]
    fn missing_tabber_is_an_error() {
        assert!(parse_roster_page("<html><body></body></html>").is_err());
    }

    #[test]
    fn json_roster_orders_by_tier() {
        let roster = Roster::from_json(
            r#"{"secret": ["La Vacca Saturno Saturnita"], "Common": ["Fluriflura", " Fluriflura "]}"#,
        )
        .unwrap();
        let entries = roster.entries();
        assert_eq!(entries[0], (Tier::Common, "Fluriflura".to_string()));
        assert_eq!(entries[1].0, Tier::Secret);
        assert_eq!(roster.total(), 2);
        assert!(Roster::from_json(r#"{"Ultra": ["X"]}"#).is_err());
    }
}
