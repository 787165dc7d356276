//! Error types for model metadata and value coercion.
//!
//! Provides a unified error type covering field registry validation,
//! category coercion, and predicate compilation failures.

use thiserror::Error;

/// Errors that can occur while inspecting fields or compiling predicates.
#[derive(Debug, Error)]
pub enum Error {
    /// The record declares no `pk`-tagged field.
    #[error("record must have a pk field")]
    MustHavePk,

    /// The pk field is not of a permitted category (text or integer).
    #[error("pk field must be text or integer")]
    PkType,

    /// Pk synthesis was attempted on a non-text pk field.
    #[error("pk field must be text when generated")]
    GenPkType,

    /// The field's category does not support the attempted coercion.
    #[error("field type must be text, integer, or boolean")]
    FieldType,

    /// A predicate referenced a field that does not exist on the record.
    #[error("predicate references unknown field: {0}")]
    PredicateRef(String),

    /// A predicate operator is not valid for the field's category.
    #[error("predicate operator not valid for field: {0}")]
    PredicateType(String),

    /// A predicate literal cannot be coerced to the field's category.
    #[error("predicate value not valid: {0}")]
    PredicateValue(String),

    /// JSON encoding or decoding of a composite cell failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for results with [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
