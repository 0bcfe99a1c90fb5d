//! Property-based tests for request normalization.
