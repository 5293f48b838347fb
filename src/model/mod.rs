pub mod record;
pub mod tier;
pub mod validation;

pub use record::CharacterRecord;
pub use tier::{Tier, Variant};
pub use validation::{
    BatchValidation, DuplicateGroup, DuplicateKind, FieldOutcome, ValidationOutcome,
    ValidationStats,
};
