//! # Timewise API
//!
//! HTTP transport layer for the conversational scheduling backend.
//!
//! This crate contains:
//! - The `AppContext` dependency injection container
//! - axum routes for the agent chat endpoint and calendar CRUD
//! - The server binary entry point

pub mod context;
pub mod routes;

pub use context::AppContext;
pub use routes::router;
