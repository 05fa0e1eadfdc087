//! OpenAI integration for the conversational scheduling agent.
//!
//! Implements the core `CompletionPort` over the Chat Completions API with
//! function calling: the tool catalog is sent on every round, tool calls come
//! back as operation requests, and operation results are relayed as `tool`
//! role messages on the next round.
//!
//! Retries for transient failures are handled by the underlying
//! [`crate::http::HttpClient`]; 4xx responses are surfaced immediately.

pub mod client;
pub mod types;

pub use client::OpenAiCompletionClient;
pub use types::OpenAiError;
