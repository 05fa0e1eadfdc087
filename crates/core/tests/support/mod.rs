//! Shared test helpers for `timewise-core` integration tests.
//!
//! In-memory implementations of every port the agent service depends on, so
//! the conversation tests can focus on behaviour instead of boilerplate.

pub mod clock;
pub mod completion;
pub mod store;
