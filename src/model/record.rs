use crate::error::{AppError, AppResult};
use crate::model::tier::Variant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One character row. `extraction_success` means a record was produced, not that every field was found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterRecord {
    pub name: String,
    pub tier: String,
    pub cost: u64,
    pub income: u64,
    pub variant: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wiki_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_timestamp: Option<DateTime<Utc>>,
    pub extraction_success: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extraction_errors: Vec<String>,
}

impl CharacterRecord {
    /// Validated constructor: name and tier must be non-blank.
    pub fn new<N, T>(name: N, tier: T, cost: u64, income: u64) -> AppResult<Self>
    where
        N: Into<String>,
        T: Into<String>,
    {
        let name = name.into().trim().to_string();
        let tier = tier.into().trim().to_string();
        if name.is_empty() {
            return Err(AppError::Validation("Character name cannot be empty".into()));
        }
        if tier.is_empty() {
            return Err(AppError::Validation(format!(
                "Tier cannot be empty for '{}'",
                name
            )));
        }
        Ok(Self {
            name,
            tier,
            cost,
            income,
            variant: Variant::default().to_string(),
            image_path: None,
            image_url: None,
            wiki_url: None,
            extraction_timestamp: None,
            extraction_success: true,
            extraction_errors: Vec::new(),
        })
    }

    /// Placeholder for a character whose page could not be processed at all.
    pub fn failed(name: &str, tier: &str, error: &AppError) -> Self {
        Self {
            name: name.trim().to_string(),
            tier: tier.to_string(),
            cost: 0,
            income: 0,
            variant: Variant::default().to_string(),
            image_path: None,
            image_url: None,
            wiki_url: None,
            extraction_timestamp: Some(Utc::now()),
            extraction_success: false,
            extraction_errors: vec![error.to_string()],
        }
    }

    pub fn with_variant<V: Into<String>>(mut self, variant: V) -> Self {
        self.variant = variant.into();
        self
    }

    pub fn with_wiki_url<U: Into<String>>(mut self, url: U) -> Self {
        self.wiki_url = Some(url.into());
        self
    }

    pub fn with_image_url<U: Into<String>>(mut self, url: U) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn with_image_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.image_path = Some(path.into());
        self
    }

    pub fn stamped(mut self, at: DateTime<Utc>) -> Self {
        self.extraction_timestamp = Some(at);
        self
    }

    pub fn push_error<S: Into<String>>(&mut self, message: S) {
        self.extraction_errors.push(message.into());
    }

    /// Equality on the persisted columns that survive a CSV round trip.
    pub fn same_core_fields(&self, other: &CharacterRecord) -> bool {
        self.name == other.name
            && self.tier == other.tier
            && self.cost == other.cost
            && self.income == other.income
            && self.variant == other.variant
    }

    pub fn image_path_display(&self) -> String {
        self.image_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }
}

/// Builds records without running any field checks, for intentionally invalid test fixtures.
#[cfg(test)]
#[derive(Debug, Clone)]
pub struct RecordFixture {
    record: CharacterRecord,
}

#[cfg(test)]
impl RecordFixture {
    pub fn named(name: &str) -> Self {
        Self {
            record: CharacterRecord {
                name: name.to_string(),
                tier: "Common".to_string(),
                cost: 100,
                income: 10,
                variant: "Standard".to_string(),
                image_path: None,
                image_url: None,
                wiki_url: None,
                extraction_timestamp: None,
                extraction_success: true,
                extraction_errors: Vec::new(),
            },
        }
    }

    pub fn tier(mut self, tier: &str) -> Self {
        self.record.tier = tier.to_string();
        self
    }

    pub fn cost(mut self, cost: u64) -> Self {
        self.record.cost = cost;
        self
    }

    pub fn income(mut self, income: u64) -> Self {
        self.record.income = income;
        self
    }

    pub fn variant(mut self, variant: &str) -> Self {
        self.record.variant = variant.to_string();
        self
    }

    pub fn image_url(mut self, url: &str) -> Self {
        self.record.image_url = Some(url.to_string());
        self
    }

    pub fn image_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.record.image_path = Some(path.into());
        self
    }

    pub fn build(self) -> CharacterRecord {
        self.record
    }
}
