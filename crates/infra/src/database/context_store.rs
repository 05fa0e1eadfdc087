//! SQLite-backed context memory.
//!
//! One `agent_state` row per (user, kind, slot), upserted in place so there
//! is never more than one live record per pair. Payloads are JSON; a payload
//! that fails to deserialize is treated as absent, not as an error.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use timewise_core::ContextStore;
use timewise_domain::{ContextRecord, ItemKind, PendingAction, Result, TimewiseError};
use tokio::task;
use tracing::warn;

use super::calendar_repository::map_join_error;
use super::manager::{map_sql_error, DbManager};

const SLOT_CONTEXT: &str = "context";
const SLOT_PENDING: &str = "pending";

pub struct SqliteContextStore {
    db: Arc<DbManager>,
}

impl SqliteContextStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    async fn write_slot<T: Serialize>(
        &self,
        user_id: i64,
        kind: ItemKind,
        slot: &'static str,
        value: &T,
    ) -> Result<()> {
        let payload = serde_json::to_string(value)
            .map_err(|err| TimewiseError::Internal(format!("state serialization: {err}")))?;
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO agent_state (user_id, kind, slot, payload, updated_at) \
                 VALUES (?, ?, ?, ?, ?) \
                 ON CONFLICT(user_id, kind, slot) DO UPDATE SET \
                 payload = excluded.payload, updated_at = excluded.updated_at",
                params![user_id, kind.as_str(), slot, payload, Utc::now().timestamp()],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn read_slot<T: DeserializeOwned>(
        &self,
        user_id: i64,
        kind: ItemKind,
        slot: &'static str,
    ) -> Result<Option<T>> {
        let db = Arc::clone(&self.db);
        let payload: Option<String> = task::spawn_blocking(move || -> Result<Option<String>> {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT payload FROM agent_state WHERE user_id = ? AND kind = ? AND slot = ?",
                params![user_id, kind.as_str(), slot],
                |row| row.get(0),
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)??;

        let Some(payload) = payload else {
            return Ok(None);
        };
        match serde_json::from_str(&payload) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!(user_id, kind = kind.as_str(), slot, error = %err,
                    "malformed state payload treated as absent");
                Ok(None)
            }
        }
    }

    async fn clear_slot(&self, user_id: i64, kind: ItemKind, slot: &'static str) -> Result<()> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "DELETE FROM agent_state WHERE user_id = ? AND kind = ? AND slot = ?",
                params![user_id, kind.as_str(), slot],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl ContextStore for SqliteContextStore {
    async fn set_context(
        &self,
        user_id: i64,
        kind: ItemKind,
        record: ContextRecord,
    ) -> Result<()> {
        self.write_slot(user_id, kind, SLOT_CONTEXT, &record).await
    }

    async fn get_context(&self, user_id: i64, kind: ItemKind) -> Result<ContextRecord> {
        Ok(self.read_slot(user_id, kind, SLOT_CONTEXT).await?.unwrap_or_default())
    }

    async fn set_pending(
        &self,
        user_id: i64,
        kind: ItemKind,
        action: PendingAction,
    ) -> Result<()> {
        self.write_slot(user_id, kind, SLOT_PENDING, &action).await
    }

    async fn get_pending(&self, user_id: i64, kind: ItemKind) -> Result<Option<PendingAction>> {
        self.read_slot(user_id, kind, SLOT_PENDING).await
    }

    async fn clear_pending(&self, user_id: i64, kind: ItemKind) -> Result<()> {
        self.clear_slot(user_id, kind, SLOT_PENDING).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone};

    use super::*;

    fn store() -> (tempfile::TempDir, Arc<DbManager>, SqliteContextStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Arc::new(DbManager::new(dir.path().join("test.db"), 2).expect("db"));
        db.run_migrations().expect("schema");
        (dir, db.clone(), SqliteContextStore::new(db))
    }

    #[tokio::test]
    async fn set_context_replaces_the_single_live_record() {
        let (_dir, _db, store) = store();
        store
            .set_context(
                1,
                ItemKind::Meeting,
                ContextRecord { title: Some("Standup".into()), date: None },
            )
            .await
            .unwrap();
        store
            .set_context(
                1,
                ItemKind::Meeting,
                ContextRecord {
                    title: Some("Retro".into()),
                    date: NaiveDate::from_ymd_opt(2026, 3, 3),
                },
            )
            .await
            .unwrap();

        let record = store.get_context(1, ItemKind::Meeting).await.unwrap();
        assert_eq!(record.title.as_deref(), Some("Retro"));
    }

    #[tokio::test]
    async fn kinds_are_independent() {
        let (_dir, _db, store) = store();
        store
            .set_context(
                1,
                ItemKind::Task,
                ContextRecord { title: Some("Report".into()), date: None },
            )
            .await
            .unwrap();

        assert!(store.get_context(1, ItemKind::Meeting).await.unwrap().is_empty());
        assert_eq!(
            store.get_context(1, ItemKind::Task).await.unwrap().title.as_deref(),
            Some("Report")
        );
    }

    #[tokio::test]
    async fn pending_round_trip_and_clear() {
        let (_dir, _db, store) = store();
        let action = PendingAction {
            kind: ItemKind::Meeting,
            title: "Standup".into(),
            description: None,
            location: None,
            priority: None,
            proposed_start: Utc.with_ymd_and_hms(2026, 3, 3, 9, 0, 0).unwrap(),
            proposed_end: Utc.with_ymd_and_hms(2026, 3, 3, 10, 0, 0).unwrap(),
        };
        store.set_pending(1, ItemKind::Meeting, action.clone()).await.unwrap();

        assert_eq!(store.get_pending(1, ItemKind::Meeting).await.unwrap(), Some(action));

        store.clear_pending(1, ItemKind::Meeting).await.unwrap();
        assert_eq!(store.get_pending(1, ItemKind::Meeting).await.unwrap(), None);
        // clearing twice is a no-op
        store.clear_pending(1, ItemKind::Meeting).await.unwrap();
    }

    #[tokio::test]
    async fn malformed_payload_is_treated_as_absent() {
        let (_dir, db, store) = store();
        let conn = db.get_connection().unwrap();
        conn.execute(
            "INSERT INTO agent_state (user_id, kind, slot, payload, updated_at) \
             VALUES (1, 'meeting', 'pending', 'not json', 0)",
            [],
        )
        .unwrap();

        assert_eq!(store.get_pending(1, ItemKind::Meeting).await.unwrap(), None);
    }
}
