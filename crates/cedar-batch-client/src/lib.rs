//! cedar-batch-client: Concurrent batch authorization checks
//!
//! This crate evaluates many authorization requests against a Cedar Agent
//! decision point with bounded parallelism, fail-fast error handling and
//! cancellation.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │               cedar-batch-client                 │
//! ├─────────────────────────────────────────────────┤
//! │  client.rs       - Client facade                │
//! │  batch/          - Producer, workers, aggregator│
//! │  agent.rs        - Cedar Agent HTTP evaluator   │
//! │  config.rs       - Layered configuration        │
//! │  observability/  - Logging setup                │
//! └─────────────────────────────────────────────────┘
//!                         │
//!                         ▼
//!               cedar-batch-domain
//! ```
//!
//! # Example
//!
//! ```ignore
//! use cedar_batch_client::{BatchInput, Client, ClientConfig};
//!
//! let client = Client::from_config(&ClientConfig::from_env()?)?;
//! let input = BatchInput::grouped("alice", [("read".into(), vec!["doc1".into()])]);
//! let decisions = client.check_batch(input).await.into_result()?;
//! ```

pub mod agent;
pub mod batch;
pub mod client;
pub mod config;
pub mod observability;

pub use agent::CedarAgentClient;
pub use batch::{
    BatchCheckError, BatchCheckHandler, BatchCheckResult, BatchDecisions, BatchOptions,
    BatchOutcome, CancelCause,
};
pub use client::Client;
pub use config::{ClientConfig, ConfigLoadError};

pub use cedar_batch_domain::{
    Action, BatchInput, Decision, Diagnostics, DomainError, Evaluator, Principal, Request,
    Resource,
};
