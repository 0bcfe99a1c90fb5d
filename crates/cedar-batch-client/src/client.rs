//! High-level client for a Cedar Agent.

use std::sync::Arc;

use cedar_batch_domain::{BatchInput, Decision, DomainResult, Request};
use tokio_util::sync::CancellationToken;

use crate::agent::CedarAgentClient;
use crate::batch::{BatchCheckHandler, BatchOptions, BatchOutcome};
use crate::config::{ClientConfig, ConfigLoadError};

/// Authorization client that checks single requests or whole batches
/// against a Cedar Agent.
pub struct Client {
    handler: BatchCheckHandler<CedarAgentClient>,
}

impl Client {
    /// Creates a client around an existing agent connection.
    pub fn new(agent: CedarAgentClient, options: BatchOptions) -> Self {
        Self {
            handler: BatchCheckHandler::new(Arc::new(agent), options),
        }
    }

    /// Creates a client from loaded configuration.
    pub fn from_config(config: &ClientConfig) -> Result<Self, ConfigLoadError> {
        config.validate()?;
        let agent = CedarAgentClient::from_settings(&config.agent)?;
        Ok(Self::new(agent, config.batch.to_options()))
    }

    /// The underlying batch handler.
    pub fn handler(&self) -> &BatchCheckHandler<CedarAgentClient> {
        &self.handler
    }

    /// Checks a single request.
    pub async fn check(&self, request: &Request) -> DomainResult<Decision> {
        self.handler.check(request).await
    }

    /// Checks a batch with the configured options.
    pub async fn check_batch(&self, input: impl Into<BatchInput>) -> BatchOutcome {
        self.handler.check_batch(input).await
    }

    /// Checks a batch with explicit options.
    pub async fn check_batch_with(
        &self,
        input: impl Into<BatchInput>,
        options: BatchOptions,
    ) -> BatchOutcome {
        self.handler.check_batch_with(input, options).await
    }

    /// Checks a batch, stopping early when `cancel` fires.
    pub async fn check_batch_cancellable(
        &self,
        input: impl Into<BatchInput>,
        cancel: CancellationToken,
    ) -> BatchOutcome {
        self.handler.check_batch_cancellable(input, cancel).await
    }
}
