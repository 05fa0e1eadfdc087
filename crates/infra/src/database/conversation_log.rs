//! SQLite-backed conversation log.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};
use timewise_core::agent::ports::ConversationLogRepository;
use timewise_domain::{ConversationTurn, Result, Role};
use tokio::task;

use super::calendar_repository::map_join_error;
use super::manager::{map_sql_error, DbManager};

pub struct SqliteConversationLog {
    db: Arc<DbManager>,
}

impl SqliteConversationLog {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConversationLogRepository for SqliteConversationLog {
    #[tracing::instrument(skip(self, content))]
    async fn append(&self, user_id: i64, role: Role, content: &str) -> Result<ConversationTurn> {
        let db = Arc::clone(&self.db);
        let content = content.to_string();
        task::spawn_blocking(move || -> Result<ConversationTurn> {
            let conn = db.get_connection()?;
            let now = Utc::now();
            conn.execute(
                "INSERT INTO chat_messages (user_id, role, content, timestamp) \
                 VALUES (?, ?, ?, ?)",
                params![user_id, role.as_str(), content, now.timestamp()],
            )
            .map_err(map_sql_error)?;
            Ok(ConversationTurn {
                id: conn.last_insert_rowid(),
                user_id,
                role,
                content,
                timestamp: datetime_from_ts(now.timestamp()),
            })
        })
        .await
        .map_err(map_join_error)?
    }

    /// Most recent turns first; the insertion id is the recency order.
    async fn recent(&self, user_id: i64, limit: usize) -> Result<Vec<ConversationTurn>> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<Vec<ConversationTurn>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, user_id, role, content, timestamp FROM chat_messages \
                     WHERE user_id = ? ORDER BY id DESC LIMIT ?",
                )
                .map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![user_id, limit as i64], turn_from_row)
                .map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn turn_from_row(row: &Row<'_>) -> rusqlite::Result<ConversationTurn> {
    let role: String = row.get(2)?;
    Ok(ConversationTurn {
        id: row.get(0)?,
        user_id: row.get(1)?,
        role: Role::parse(&role).unwrap_or(Role::User),
        content: row.get(3)?,
        timestamp: datetime_from_ts(row.get(4)?),
    })
}

fn datetime_from_ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}
