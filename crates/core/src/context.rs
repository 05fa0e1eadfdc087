//! Context memory: per-user conversational state.
//!
//! Keeps, per (user, kind), the most recently referenced title/date and a
//! single outstanding pending action. Both follow a replace-or-clear-one
//! discipline: setting replaces whatever was live for that pair, there is
//! never more than one record.

use async_trait::async_trait;
use timewise_domain::{ContextRecord, ItemKind, PendingAction, Result};

/// Typed store for context records and pending actions.
///
/// Implementations must make `set_*` an atomic replace of the single live
/// record for the (user, kind) pair. A malformed stored payload is treated
/// as an absent record, never an error.
#[async_trait]
pub trait ContextStore: Send + Sync {
    /// Replace the live context record for `(user_id, kind)`.
    async fn set_context(
        &self,
        user_id: i64,
        kind: ItemKind,
        record: ContextRecord,
    ) -> Result<()>;

    /// Read the live context record; absent records yield an empty one.
    async fn get_context(&self, user_id: i64, kind: ItemKind) -> Result<ContextRecord>;

    /// Replace the live pending action for `(user_id, kind)`.
    async fn set_pending(
        &self,
        user_id: i64,
        kind: ItemKind,
        action: PendingAction,
    ) -> Result<()>;

    /// Read the live pending action, if any.
    async fn get_pending(&self, user_id: i64, kind: ItemKind) -> Result<Option<PendingAction>>;

    /// Drop the live pending action. Clearing an absent record is a no-op.
    async fn clear_pending(&self, user_id: i64, kind: ItemKind) -> Result<()>;
}
