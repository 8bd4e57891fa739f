//! Property-based tests for the gateway's resilience primitives.
//!
//! Run with: cargo test --test property_tests
//!
//! Generates random inputs and checks the two invariants spec.md §8 calls
//! out by name: rate conformance (the token bucket) and no-starvation
//! (the priority queue).

mod property;
