//! # Timewise Infrastructure
//!
//! Infrastructure implementations of core domain ports.
//!
//! This crate contains:
//! - Database implementations (SQLite)
//! - HTTP client implementations
//! - External service integrations (OpenAI chat completions)
//! - Natural-language date parsing
//! - Configuration loading
//!
//! ## Architecture
//! - Implements traits defined in `timewise-core`
//! - Depends on `timewise-domain` and `timewise-core`
//! - Contains all "impure" code (I/O, external APIs)

pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod integrations;
pub mod parsing;

// Re-export commonly used items
pub use database::*;
pub use http::*;
pub use integrations::*;
pub use parsing::*;
