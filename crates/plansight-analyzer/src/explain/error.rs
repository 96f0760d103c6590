//! Error types for EXPLAIN plan parsing

use thiserror::Error;

/// Errors that can occur when turning EXPLAIN output into a plan.
///
/// Any of these is fatal to the one analysis run that produced it; no
/// partially built plan is ever returned alongside an error.
#[derive(Debug, Error)]
pub enum PlanParseError {
    #[error("Failed to parse plan JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid plan: missing Plan object")]
    MissingPlan,

    #[error("Invalid plan: property {property:?} must be {expected}")]
    InvalidProperty {
        property: String,
        expected: &'static str,
    },

    #[error("Empty EXPLAIN output")]
    EmptyInput,

    #[error("No plan nodes found in EXPLAIN output")]
    NoPlanNodes,
}

/// Result type for plan parsing
pub type Result<T> = std::result::Result<T, PlanParseError>;
