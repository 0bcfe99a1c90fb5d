//! Authorization model types.

mod input;
mod types;
mod types_proptest;

pub use input::BatchInput;
pub use types::{Action, Decision, Diagnostics, Principal, Request, Resource};
