//! Cedar Agent evaluator.
//!
//! Sends each request as `POST {base_url}/v1/is_authorized` and maps the
//! agent's `{"decision": "Allow" | "Deny", "diagnostics": {...}}` answer onto
//! a [`Decision`].

use std::time::Duration;

use async_trait::async_trait;
use cedar_batch_domain::{Decision, Diagnostics, DomainError, DomainResult, Evaluator, Request};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::{AgentSettings, ConfigLoadError};

/// Where Cedar Agent listens unless configured otherwise.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8180";

const IS_AUTHORIZED_PATH: &str = "/v1/is_authorized";

/// Body returned by the agent for one authorization request.
#[derive(Debug, Deserialize)]
struct AgentResponse {
    decision: String,
    #[serde(default)]
    diagnostics: Diagnostics,
}

impl From<AgentResponse> for Decision {
    fn from(response: AgentResponse) -> Self {
        Self {
            allowed: response.decision == "Allow",
            diagnostics: response.diagnostics,
        }
    }
}

/// HTTP client for a Cedar Agent decision point.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct CedarAgentClient {
    http: reqwest::Client,
    base_url: String,
}

impl CedarAgentClient {
    /// Creates a client for an agent at [`DEFAULT_BASE_URL`].
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Builds a client from agent settings, applying the per-call timeout.
    pub fn from_settings(settings: &AgentSettings) -> Result<Self, ConfigLoadError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| ConfigLoadError::Invalid {
                message: format!("unable to build http client: {e}"),
            })?;
        Ok(Self::new(http).with_base_url(&settings.base_url))
    }

    /// Points the client at a different agent.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// The agent's base URL, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, IS_AUTHORIZED_PATH)
    }
}

#[async_trait]
impl Evaluator for CedarAgentClient {
    #[instrument(
        skip(self, request),
        fields(principal = %request.principal, action = %request.action, resource = %request.resource)
    )]
    async fn evaluate(&self, request: &Request) -> DomainResult<Decision> {
        let response = self
            .http
            .post(self.endpoint())
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_builder() {
                    DomainError::InvalidRequest {
                        message: e.to_string(),
                    }
                } else {
                    DomainError::Transport {
                        message: e.to_string(),
                    }
                }
            })?
            .error_for_status()
            .map_err(|e| DomainError::Transport {
                message: e.to_string(),
            })?;

        let body: AgentResponse =
            response
                .json()
                .await
                .map_err(|e| DomainError::InvalidResponse {
                    message: e.to_string(),
                })?;

        debug!(decision = %body.decision, "agent answered");
        Ok(body.into())
    }
}
