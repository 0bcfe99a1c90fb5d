//! Data types for batch check operations.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use cedar_batch_domain::{Action, Decision, DomainError, Principal, Request, Resource};
use tokio_util::sync::CancellationToken;

/// Number of concurrent evaluations used when nothing else is configured.
pub const DEFAULT_PARALLELISM: usize = 3;

/// Decisions of a batch, keyed by the request that produced them.
///
/// Duplicate requests collapse into one entry. Which duplicate's decision
/// survives depends on worker scheduling and is not deterministic.
pub type BatchDecisions = HashMap<Request, Decision>;

/// Why a batch stopped before finishing its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelCause {
    /// The caller's cancellation token fired.
    Caller,
    /// The batch ran past its configured timeout.
    DeadlineExceeded,
}

impl fmt::Display for CancelCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Caller => f.write_str("canceled by caller"),
            Self::DeadlineExceeded => f.write_str("deadline exceeded"),
        }
    }
}

/// Errors that can occur during batch check operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BatchCheckError {
    /// A single evaluation failed; the whole batch was aborted.
    #[error(
        "unable to authorize principal {principal} for action {action} on resource {resource}: {source}"
    )]
    Evaluation {
        principal: Principal,
        action: Action,
        resource: Resource,
        #[source]
        source: DomainError,
    },

    /// The batch was canceled externally or timed out.
    #[error("batch cancelled: {cause}")]
    Cancelled { cause: CancelCause },

    /// The requested worker count cannot make progress.
    #[error("invalid parallelism {parallelism}: at least one worker is required")]
    InvalidParallelism { parallelism: usize },

    /// A pipeline task panicked or was aborted by the runtime.
    #[error("batch task failed: {message}")]
    TaskFailed { message: String },
}

impl BatchCheckError {
    /// Wraps an evaluator failure with the request that caused it.
    pub fn evaluation(request: Request, source: DomainError) -> Self {
        Self::Evaluation {
            principal: request.principal,
            action: request.action,
            resource: request.resource,
            source,
        }
    }

    /// Returns true if the batch stopped because of cancellation or timeout.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Returns true if an evaluator call failed.
    pub fn is_evaluation(&self) -> bool {
        matches!(self, Self::Evaluation { .. })
    }
}

/// Result type for batch check operations.
pub type BatchCheckResult<T> = Result<T, BatchCheckError>;

/// Knobs for a single batch run.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// Number of workers evaluating requests concurrently. Must be at least 1.
    pub parallelism: usize,
    /// Upper bound on the whole batch. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Caller-owned cancellation. Canceling it aborts the batch; the batch
    /// never cancels it in return.
    pub cancel: Option<CancellationToken>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            parallelism: DEFAULT_PARALLELISM,
            timeout: None,
            cancel: None,
        }
    }
}

impl BatchOptions {
    /// Creates options with the given parallelism and no timeout.
    pub fn new(parallelism: usize) -> Self {
        Self {
            parallelism,
            ..Default::default()
        }
    }

    /// Sets the number of workers.
    pub fn with_parallelism(mut self, parallelism: usize) -> Self {
        self.parallelism = parallelism;
        self
    }

    /// Sets the batch timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Ties the batch to a caller-owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// What a batch run produced: every decision gathered, plus the first error.
///
/// Decisions collected before a failure or cancellation are kept so callers
/// can see how far the batch got.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub decisions: BatchDecisions,
    pub error: Option<BatchCheckError>,
}

impl BatchOutcome {
    pub(crate) fn failed(error: BatchCheckError) -> Self {
        Self {
            decisions: HashMap::new(),
            error: Some(error),
        }
    }

    /// Returns true if every request was evaluated.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Returns the decisions, or the first error if there was one.
    pub fn into_result(self) -> BatchCheckResult<BatchDecisions> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.decisions),
        }
    }

    /// Splits the outcome into partial decisions and the first error.
    pub fn into_parts(self) -> (BatchDecisions, Option<BatchCheckError>) {
        (self.decisions, self.error)
    }
}
