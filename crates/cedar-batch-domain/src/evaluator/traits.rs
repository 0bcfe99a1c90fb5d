//! Trait implemented by anything that can decide one authorization request.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DomainResult;
use crate::model::{Decision, Request};

/// Decides a single authorization request.
///
/// Batch evaluation calls this from several tasks at once, so implementations
/// must be safe to share across threads.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// Evaluates one request and returns its decision.
    async fn evaluate(&self, request: &Request) -> DomainResult<Decision>;
}

#[async_trait]
impl<E> Evaluator for Arc<E>
where
    E: Evaluator + ?Sized,
{
    async fn evaluate(&self, request: &Request) -> DomainResult<Decision> {
        (**self).evaluate(request).await
    }
}
