//! SQLite persistence adapters.

mod calendar_repository;
mod context_store;
mod conversation_log;
mod manager;

pub use calendar_repository::SqliteCalendarRepository;
pub use context_store::SqliteContextStore;
pub use conversation_log::SqliteConversationLog;
pub use manager::{DbConnection, DbManager};
