//! Batch check handler implementation.

use std::sync::Arc;

use cedar_batch_domain::{BatchInput, Decision, DomainResult, Evaluator, Request};
use tokio_util::sync::CancellationToken;

use super::pipeline::run_batch;
use super::types::{BatchOptions, BatchOutcome};

/// Handler for single and batch permission checks.
///
/// Holds the evaluator shared by every worker and the options applied to
/// batches that don't bring their own.
pub struct BatchCheckHandler<E>
where
    E: Evaluator + ?Sized,
{
    /// The decision point every request is sent to.
    evaluator: Arc<E>,
    /// Defaults for `check_batch`.
    options: BatchOptions,
}

impl<E> BatchCheckHandler<E>
where
    E: Evaluator + ?Sized + 'static,
{
    /// Creates a new batch check handler.
    pub fn new(evaluator: Arc<E>, options: BatchOptions) -> Self {
        Self { evaluator, options }
    }

    /// The evaluator requests are sent to.
    pub fn evaluator(&self) -> &Arc<E> {
        &self.evaluator
    }

    /// Default options used by [`check_batch`](Self::check_batch).
    pub fn options(&self) -> &BatchOptions {
        &self.options
    }

    /// Evaluates a single request directly, without the worker pool.
    pub async fn check(&self, request: &Request) -> DomainResult<Decision> {
        self.evaluator.evaluate(request).await
    }

    /// Evaluates a batch with the handler's default options.
    pub async fn check_batch(&self, input: impl Into<BatchInput>) -> BatchOutcome {
        self.check_batch_with(input, self.options.clone()).await
    }

    /// Evaluates a batch with the default options, aborting when `cancel` fires.
    pub async fn check_batch_cancellable(
        &self,
        input: impl Into<BatchInput>,
        cancel: CancellationToken,
    ) -> BatchOutcome {
        let options = self.options.clone().with_cancellation(cancel);
        self.check_batch_with(input, options).await
    }

    /// Evaluates a batch with explicit options.
    pub async fn check_batch_with(
        &self,
        input: impl Into<BatchInput>,
        options: BatchOptions,
    ) -> BatchOutcome {
        run_batch(Arc::clone(&self.evaluator), input.into(), options).await
    }
}
