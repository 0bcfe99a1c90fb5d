//! Domain error types for authorization evaluation.

use thiserror::Error;

/// Errors raised while evaluating a single authorization request.
///
/// The batch pipeline treats these as opaque causes and wraps them with the
/// request that failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    /// The request could not be encoded for the decision point.
    #[error("unable to build authorization request: {message}")]
    InvalidRequest { message: String },

    /// The decision point could not be reached or answered with a failure status.
    #[error("unable to execute authorization request: {message}")]
    Transport { message: String },

    /// The decision point answered with a body that is not a decision.
    #[error("unable to read authorization response: {message}")]
    InvalidResponse { message: String },

    /// Failure reported by a custom evaluator implementation.
    #[error("evaluator error: {message}")]
    Evaluator { message: String },
}

impl DomainError {
    /// Convenience constructor for custom evaluators.
    pub fn evaluator(message: impl Into<String>) -> Self {
        Self::Evaluator {
            message: message.into(),
        }
    }
}

/// Result type for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
