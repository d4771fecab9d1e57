//! Error types for quality validation.

use thiserror::Error;

/// Quality validation errors.
#[derive(Error, Debug)]
pub enum QualityError {
    /// A rule could not be evaluated against the batch (Q001).
    #[error("[Q001] Rule '{rule}' failed to evaluate: {reason}")]
    Evaluation { rule: String, reason: String },

    /// A referential check could not resolve its reference keys (Q002).
    #[error("[Q002] Reference lookup failed for {table}.{column}: {reason}")]
    Reference {
        table: String,
        column: String,
        reason: String,
    },

    /// Persisting a metric failed (Q003).
    #[error("[Q003] Metadata write failed")]
    Meta(#[from] silo_meta::MetaError),
}

/// Result type alias for [`QualityError`].
pub type QualityResult<T> = Result<T, QualityError>;
