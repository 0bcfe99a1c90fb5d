//! cedar-batch-domain: Core authorization types
//!
//! This crate contains the pieces every batch check is built from:
//! - Principal / action / resource identifiers and the request triple
//! - Decisions and their diagnostics
//! - Batch input shapes and their normalization into flat requests
//! - The evaluator contract implemented by decision points
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │             cedar-batch-domain               │
//! ├─────────────────────────────────────────────┤
//! │  model/      - Requests, decisions, inputs  │
//! │  evaluator/  - Evaluator trait              │
//! │  error.rs    - Domain errors                │
//! └─────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod evaluator;
pub mod model;

// Re-export commonly used types at the crate root
pub use error::{DomainError, DomainResult};
pub use evaluator::Evaluator;
pub use model::{Action, BatchInput, Decision, Diagnostics, Principal, Request, Resource};
