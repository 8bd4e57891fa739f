//! Property-based tests for gateway primitives.
//!
//! Run with: cargo test --test property_tests

pub mod priority_queue;
pub mod token_bucket;
