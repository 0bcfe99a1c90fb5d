//! The decision-point contract.

mod traits;

pub use traits::Evaluator;
