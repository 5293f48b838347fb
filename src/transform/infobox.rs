use crate::config;
use crate::error::AppError;
use crate::transform::numeric::parse_numeric;
use crate::transform::util::normalize_whitespace;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;

static INFOBOX_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "aside.portable-infobox",
        "table.infobox",
        "table.wikitable.infobox",
        "div.infobox",
        "div.portable-infobox",
    ]
    .iter()
    .map(|s| Selector::parse(s).expect("Invalid infobox selector"))
    .collect()
});
static CLASSED_CONTAINER_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("aside[class], table[class], div[class]").expect("Invalid container selector")
});
static INFOBOX_CLASS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)info|character|stats").expect("Invalid infobox class regex"));

static PI_DATA_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".pi-data").expect("Invalid pi-data selector"));
static PI_LABEL_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".pi-data-label").expect("Invalid pi-data-label selector"));
static PI_VALUE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".pi-data-value").expect("Invalid pi-data-value selector"));
static ROW_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr").expect("Invalid tr selector"));
static CELL_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("th, td").expect("Invalid cell selector"));
static DATA_SOURCE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[data-source]").expect("Invalid data-source selector"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledValue {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InfoboxFields {
    pub cost: Option<u64>,
    pub income: Option<u64>,
    pub errors: Vec<String>,
}

pub fn find_infobox(doc: &Html) -> Option<ElementRef<'_>> {
    INFOBOX_SELECTORS
        .iter()
        .find_map(|sel| doc.select(sel).next())
        .or_else(|| {
            doc.select(&CLASSED_CONTAINER_SELECTOR).find(|el| {
                el.value()
                    .attr("class")
                    .is_some_and(|class| INFOBOX_CLASS_RE.is_match(class))
            })
        })
}

/// Label/value pairs in document priority: portable-infobox items, table rows, then
/// anything tagged with a `data-source` attribute.
pub fn labeled_values(infobox: ElementRef<'_>) -> Vec<LabeledValue> {
    let mut pairs = Vec::new();

    for item in infobox.select(&PI_DATA_SELECTOR) {
        let label = item
            .select(&PI_LABEL_SELECTOR)
            .next()
            .map(element_text)
            .or_else(|| item.value().attr("data-source").map(str::to_string));
        let value = item.select(&PI_VALUE_SELECTOR).next().map(element_text);
        if let (Some(label), Some(value)) = (label, value) {
            pairs.push(LabeledValue { label, value });
        }
    }

    for row in infobox.select(&ROW_SELECTOR) {
        let cells: Vec<String> = row.select(&CELL_SELECTOR).map(element_text).collect();
        if let [label, value, ..] = cells.as_slice() {
            pairs.push(LabeledValue {
                label: label.clone(),
                value: value.clone(),
            });
        }
    }

    for el in infobox.select(&DATA_SOURCE_SELECTOR) {
        if let Some(source) = el.value().attr("data-source") {
            let value = el
                .select(&PI_VALUE_SELECTOR)
                .next()
                .map(element_text)
                .unwrap_or_else(|| element_text(el));
            pairs.push(LabeledValue {
                label: source.replace('_', " "),
                value,
            });
        }
    }

    pairs
}

pub fn find_numeric(pairs: &[LabeledValue], labels: &[&str]) -> Option<u64> {
    pairs
        .iter()
        .filter(|p| label_matches(&p.label, labels))
        .find_map(|p| parse_numeric(&p.value))
}

/// Last resort for infoboxes without label cells: a text run naming the field,
/// or the run right after it.
fn find_numeric_in_text(infobox: ElementRef<'_>, labels: &[&str]) -> Option<u64> {
    let runs: Vec<String> = infobox
        .text()
        .map(normalize_whitespace)
        .filter(|t| !t.is_empty())
        .collect();

    runs.iter().enumerate().find_map(|(i, run)| {
        if !label_matches(run, labels) {
            return None;
        }
        parse_numeric(run).or_else(|| runs.get(i + 1).and_then(|next| parse_numeric(next)))
    })
}

fn label_matches(label: &str, labels: &[&str]) -> bool {
    let lower = label.to_lowercase();
    labels.iter().any(|l| lower.contains(l))
}

fn element_text(el: ElementRef<'_>) -> String {
    normalize_whitespace(&el.text().collect::<String>())
}

/// Cost and income from the page's infobox. Missing values are reported in `errors`, never fatal.
pub fn extract_fields(doc: &Html) -> InfoboxFields {
    let mut fields = InfoboxFields::default();

    let Some(infobox) = find_infobox(doc) else {
        fields
            .errors
            .push("No infobox found on character page".to_string());
        fields
            .errors
            .push(AppError::ExtractionFieldMissing("Cost".into()).to_string());
        fields
            .errors
            .push(AppError::ExtractionFieldMissing("Income".into()).to_string());
        return fields;
    };

    let pairs = labeled_values(infobox);
    fields.cost = find_numeric(&pairs, &config::COST_LABELS)
        .or_else(|| find_numeric_in_text(infobox, &config::COST_LABELS));
    fields.income = find_numeric(&pairs, &config::INCOME_LABELS)
        .or_else(|| find_numeric_in_text(infobox, &config::INCOME_LABELS));

    if fields.cost.is_none() {
        fields
            .errors
            .push(AppError::ExtractionFieldMissing("Cost".into()).to_string());
    }
    if fields.income.is_none() {
        fields
            .errors
            .push(AppError::ExtractionFieldMissing("Income".into()).to_string());
    }
    fields
}
