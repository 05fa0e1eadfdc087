//! # Timewise Core
//!
//! Pure business logic layer - no infrastructure dependencies.
//!
//! This crate contains:
//! - The availability engine and time resolution rules
//! - Intent and reference extraction heuristics
//! - The conversational orchestration loop
//! - Port/adapter interfaces (traits)
//!
//! ## Architecture Principles
//! - Only depends on `timewise-domain`
//! - No database, HTTP, or model-client code
//! - All external collaborators via traits
//! - Pure, testable business logic

pub mod agent;
pub mod availability;
pub mod context;
pub mod intent;
pub mod timeres;

// Re-export specific items to avoid ambiguity
pub use agent::ports::{
    CalendarRepository, Clock, CompletionOutcome, CompletionPort, ConversationLogRepository,
    ItemFilter, OperationRequest, PromptMessage, SystemClock, ToolSpec,
};
pub use agent::AgentService;
pub use context::ContextStore;
pub use timeres::{DateExpressionParser, TimeResolver};
