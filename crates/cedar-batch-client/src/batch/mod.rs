//! Concurrent batch authorization checks.
//!
//! A batch is flattened into individual requests, streamed through a bounded
//! hand-off queue to a fixed pool of workers, and the decisions are folded
//! into one map keyed by request.
//!
//! - **Fail-fast**: the first evaluator error cancels the batch and is the
//!   error reported; later errors are dropped.
//! - **Cancellation**: a caller token or a timeout aborts the batch the same
//!   way an evaluation failure does.
//! - **Partial results**: decisions gathered before an abort are returned
//!   alongside the error.
//!
//! Results carry no ordering. When the input contains the same request more
//! than once, only one decision is kept for it, and which one is decided by
//! worker scheduling.

mod handler;
mod pipeline;
mod types;

pub use handler::BatchCheckHandler;
pub use pipeline::run_batch;
pub use types::{
    BatchCheckError, BatchCheckResult, BatchDecisions, BatchOptions, BatchOutcome, CancelCause,
    DEFAULT_PARALLELISM,
};
