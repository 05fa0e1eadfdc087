//! Conversational scheduling agent.
//!
//! The orchestration loop that turns one natural-language message into a
//! sequence of calendar operations, plus the port traits and tool catalog it
//! dispatches over.

pub mod ports;
pub mod service;
pub mod tools;

pub use service::AgentService;
