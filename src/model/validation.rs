use crate::model::record::CharacterRecord;
use serde::Serialize;

/// Result of checking one field. `value` is the corrected value in non-strict mode.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldOutcome<T> {
    pub value: T,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl<T> FieldOutcome<T> {
    pub fn clean(value: T) -> Self {
        Self {
            value,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn warn<S: Into<String>>(mut self, message: S) -> Self {
        self.warnings.push(message.into());
        self
    }

    pub fn fail<S: Into<String>>(mut self, message: S) -> Self {
        self.errors.push(message.into());
        self
    }

    /// Routes an issue to errors in strict mode and to warnings otherwise.
    pub fn flag<S: Into<String>>(self, strict: bool, message: S) -> Self {
        if strict {
            self.fail(message)
        } else {
            self.warn(message)
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub normalized: Option<CharacterRecord>,
}

impl ValidationOutcome {
    pub fn absorb<T>(&mut self, field: &str, outcome: FieldOutcome<T>) -> T {
        self.errors
            .extend(outcome.errors.into_iter().map(|e| format!("{}: {}", field, e)));
        self.warnings
            .extend(outcome.warnings.into_iter().map(|w| format!("{}: {}", field, w)));
        outcome.value
    }
}

/// Declaration order is severity, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DuplicateKind {
    Exact,
    ExactName,
    SimilarName,
    SameStatsDifferentName,
}

impl DuplicateKind {
    /// Exact and exact-name duplicates make the whole batch invalid.
    pub fn invalidates_batch(self) -> bool {
        matches!(self, DuplicateKind::Exact | DuplicateKind::ExactName)
    }

    pub fn label(self) -> &'static str {
        match self {
            DuplicateKind::Exact => "exact",
            DuplicateKind::ExactName => "exact_name",
            DuplicateKind::SimilarName => "similar_name",
            DuplicateKind::SameStatsDifferentName => "same_stats",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateGroup {
    pub anchor_index: usize,
    pub duplicate_indices: Vec<usize>,
    pub similarity: f64,
    pub kind: DuplicateKind,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationStats {
    pub records_validated: usize,
    pub names_normalized: usize,
    pub numeric_corrections: usize,
    pub image_url_checks: usize,
    pub duplicates_found: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub outcomes: Vec<ValidationOutcome>,
    pub duplicates: Vec<DuplicateGroup>,
    pub stats: ValidationStats,
}

impl BatchValidation {
    /// Normalized copies of records that passed, in input order.
    pub fn accepted_records(&self) -> Vec<CharacterRecord> {
        self.outcomes
            .iter()
            .filter(|o| o.is_valid)
            .filter_map(|o| o.normalized.clone())
            .collect()
    }

    pub fn rejected_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_valid).count()
    }

    pub fn has_blocking_duplicates(&self) -> bool {
        self.duplicates.iter().any(|g| g.kind.invalidates_batch())
    }
}
