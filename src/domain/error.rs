use thiserror::Error as ThisError;

/// Errors raised by structural edits of a plan.
#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum Error {
    /// No feature with this name exists.
    #[error("feature '{0}' not found")]
    FeatureNotFound(String),

    /// A feature with this name already exists.
    #[error("feature '{0}' already exists")]
    DuplicateFeature(String),

    /// No sub-feature with this key exists in the feature.
    #[error("sub-feature '{0}' not found")]
    SubFeatureNotFound(String),

    /// No item with this ordinal exists in the sub-feature.
    #[error("item '{0}' not found")]
    ItemNotFound(String),

    /// The sub-feature has no item to move.
    #[error("sub-feature '{0}' has no items")]
    EmptySubFeature(String),

    /// The given ordinal is not a number, or is too large to shift up.
    #[error("invalid ordinal '{0}': expected a non-negative integer")]
    InvalidOrdinal(String),
}
