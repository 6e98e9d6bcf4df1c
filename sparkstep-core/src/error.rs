//! Errors raised while turning a job spec into a job document

use thiserror::Error;

/// A job spec that cannot be submitted as given
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    /// A required field is empty or missing
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Two pieces of configuration disagree and neither may win
    #[error("conflicting configuration for `{field}`: {explicit:?} vs {raw:?} in raw job document")]
    Conflict {
        field: String,
        explicit: String,
        raw: String,
    },

    /// The raw job document or a payload fragment is malformed
    #[error("malformed job document: {0}")]
    Malformed(String),
}
