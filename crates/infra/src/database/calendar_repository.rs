//! SQLite-backed calendar repository.
//!
//! Implements the async `CalendarRepository` port over the shared connection
//! pool. All queries run on blocking worker threads.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Row, ToSql};
use timewise_core::agent::ports::{CalendarRepository, ItemFilter};
use timewise_domain::{
    Meeting, MeetingDraft, MeetingPatch, Result, Task, TaskDraft, TaskPatch, TaskPriority,
    TaskStatus, TimewiseError,
};
use tokio::task;

use super::manager::{map_sql_error, DbConnection, DbManager};

const MEETING_COLUMNS: &str =
    "id, user_id, title, description, location, start_time, end_time, created_at, updated_at";
const TASK_COLUMNS: &str = "id, user_id, title, description, priority, status, start_time, \
     end_time, created_at, updated_at";

pub struct SqliteCalendarRepository {
    db: Arc<DbManager>,
}

impl SqliteCalendarRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CalendarRepository for SqliteCalendarRepository {
    #[tracing::instrument(skip(self, draft), fields(title = %draft.title))]
    async fn create_meeting(&self, user_id: i64, draft: MeetingDraft) -> Result<Meeting> {
        check_interval(draft.start_time, draft.end_time)?;
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<Meeting> {
            let conn = db.get_connection()?;
            let now = Utc::now();
            conn.execute(
                "INSERT INTO meetings (user_id, title, description, location, start_time, \
                 end_time, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    user_id,
                    draft.title,
                    draft.description,
                    draft.location,
                    draft.start_time.timestamp(),
                    draft.end_time.timestamp(),
                    now.timestamp(),
                    now.timestamp(),
                ],
            )
            .map_err(map_sql_error)?;
            fetch_meeting(&conn, user_id, conn.last_insert_rowid())
        })
        .await
        .map_err(map_join_error)?
    }

    #[tracing::instrument(skip(self, patch))]
    async fn update_meeting(
        &self,
        user_id: i64,
        meeting_id: i64,
        patch: MeetingPatch,
    ) -> Result<Meeting> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<Meeting> {
            let conn = db.get_connection()?;
            let current = fetch_meeting(&conn, user_id, meeting_id)?;

            let title = patch.title.unwrap_or(current.title);
            let description = patch.description.or(current.description);
            let location = patch.location.or(current.location);
            let start_time = patch.start_time.unwrap_or(current.start_time);
            let end_time = patch.end_time.unwrap_or(current.end_time);
            check_interval(start_time, end_time)?;

            conn.execute(
                "UPDATE meetings SET title = ?, description = ?, location = ?, start_time = ?, \
                 end_time = ?, updated_at = ? WHERE id = ? AND user_id = ?",
                params![
                    title,
                    description,
                    location,
                    start_time.timestamp(),
                    end_time.timestamp(),
                    Utc::now().timestamp(),
                    meeting_id,
                    user_id,
                ],
            )
            .map_err(map_sql_error)?;
            fetch_meeting(&conn, user_id, meeting_id)
        })
        .await
        .map_err(map_join_error)?
    }

    #[tracing::instrument(skip(self))]
    async fn delete_meeting(&self, user_id: i64, meeting_id: i64) -> Result<()> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            let deleted = conn
                .execute(
                    "DELETE FROM meetings WHERE id = ? AND user_id = ?",
                    params![meeting_id, user_id],
                )
                .map_err(map_sql_error)?;
            if deleted == 0 {
                return Err(TimewiseError::NotFound(format!("meeting {meeting_id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_meetings(&self, user_id: i64, filter: &ItemFilter) -> Result<Vec<Meeting>> {
        let db = Arc::clone(&self.db);
        let filter = filter.clone();
        task::spawn_blocking(move || -> Result<Vec<Meeting>> {
            let conn = db.get_connection()?;
            let (clause, clause_params) = filter_clause(&filter, false);
            let sql = format!(
                "SELECT {MEETING_COLUMNS} FROM meetings WHERE user_id = ?{clause} \
                 ORDER BY start_time ASC"
            );

            let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(user_id)];
            params.extend(clause_params);

            let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
            let rows = stmt
                .query_map(
                    params_from_iter(params.iter().map(|p| p.as_ref() as &dyn ToSql)),
                    meeting_from_row,
                )
                .map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    #[tracing::instrument(skip(self, draft), fields(title = %draft.title))]
    async fn create_task(&self, user_id: i64, draft: TaskDraft) -> Result<Task> {
        if let (Some(start), Some(end)) = (draft.start_time, draft.end_time) {
            check_interval(start, end)?;
        }
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<Task> {
            let conn = db.get_connection()?;
            let now = Utc::now();
            conn.execute(
                "INSERT INTO tasks (user_id, title, description, priority, status, start_time, \
                 end_time, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                params![
                    user_id,
                    draft.title,
                    draft.description,
                    draft.priority.as_str(),
                    TaskStatus::default().as_str(),
                    draft.start_time.map(|t| t.timestamp()),
                    draft.end_time.map(|t| t.timestamp()),
                    now.timestamp(),
                    now.timestamp(),
                ],
            )
            .map_err(map_sql_error)?;
            fetch_task(&conn, user_id, conn.last_insert_rowid())
        })
        .await
        .map_err(map_join_error)?
    }

    #[tracing::instrument(skip(self, patch))]
    async fn update_task(&self, user_id: i64, task_id: i64, patch: TaskPatch) -> Result<Task> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<Task> {
            let conn = db.get_connection()?;
            let current = fetch_task(&conn, user_id, task_id)?;

            let title = patch.title.unwrap_or(current.title);
            let description = patch.description.or(current.description);
            let priority = patch.priority.unwrap_or(current.priority);
            let status = patch.status.unwrap_or(current.status);
            let start_time = patch.start_time.or(current.start_time);
            let end_time = patch.end_time.or(current.end_time);
            if let (Some(start), Some(end)) = (start_time, end_time) {
                check_interval(start, end)?;
            }

            conn.execute(
                "UPDATE tasks SET title = ?, description = ?, priority = ?, status = ?, \
                 start_time = ?, end_time = ?, updated_at = ? WHERE id = ? AND user_id = ?",
                params![
                    title,
                    description,
                    priority.as_str(),
                    status.as_str(),
                    start_time.map(|t| t.timestamp()),
                    end_time.map(|t| t.timestamp()),
                    Utc::now().timestamp(),
                    task_id,
                    user_id,
                ],
            )
            .map_err(map_sql_error)?;
            fetch_task(&conn, user_id, task_id)
        })
        .await
        .map_err(map_join_error)?
    }

    #[tracing::instrument(skip(self))]
    async fn delete_task(&self, user_id: i64, task_id: i64) -> Result<()> {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> Result<()> {
            let conn = db.get_connection()?;
            let deleted = conn
                .execute(
                    "DELETE FROM tasks WHERE id = ? AND user_id = ?",
                    params![task_id, user_id],
                )
                .map_err(map_sql_error)?;
            if deleted == 0 {
                return Err(TimewiseError::NotFound(format!("task {task_id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn find_tasks(&self, user_id: i64, filter: &ItemFilter) -> Result<Vec<Task>> {
        let db = Arc::clone(&self.db);
        let filter = filter.clone();
        task::spawn_blocking(move || -> Result<Vec<Task>> {
            let conn = db.get_connection()?;
            let (clause, clause_params) = filter_clause(&filter, true);
            let sql = format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ?{clause} \
                 ORDER BY start_time ASC, id ASC"
            );

            let mut params: Vec<Box<dyn ToSql>> = vec![Box::new(user_id)];
            params.extend(clause_params);

            let mut stmt = conn.prepare(&sql).map_err(map_sql_error)?;
            let rows = stmt
                .query_map(
                    params_from_iter(params.iter().map(|p| p.as_ref() as &dyn ToSql)),
                    task_from_row,
                )
                .map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }
}

// Intervals are half-open; empty and inverted ones are rejected before any write.
fn check_interval(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<()> {
    if start >= end {
        return Err(TimewiseError::InvalidInput(format!(
            "start time {start} must be before end time {end}"
        )));
    }
    Ok(())
}

/// Extra WHERE clauses for an [`ItemFilter`], with their bind parameters.
/// Tasks without both time bounds never match a range filter.
fn filter_clause(filter: &ItemFilter, nullable_times: bool) -> (String, Vec<Box<dyn ToSql>>) {
    let mut clause = String::new();
    let mut params: Vec<Box<dyn ToSql>> = Vec::new();

    if let Some(id) = filter.id {
        clause.push_str(" AND id = ?");
        params.push(Box::new(id));
    }
    if let Some(title) = &filter.title {
        clause.push_str(" AND LOWER(title) LIKE ?");
        params.push(Box::new(format!("%{}%", title.to_lowercase())));
    }
    if let Some(range) = &filter.range {
        if nullable_times {
            clause.push_str(" AND start_time IS NOT NULL AND end_time IS NOT NULL");
        }
        clause.push_str(" AND start_time < ? AND end_time > ?");
        params.push(Box::new(range.end.timestamp()));
        params.push(Box::new(range.start.timestamp()));
    }

    (clause, params)
}

fn fetch_meeting(conn: &DbConnection, user_id: i64, meeting_id: i64) -> Result<Meeting> {
    conn.query_row(
        &format!("SELECT {MEETING_COLUMNS} FROM meetings WHERE id = ? AND user_id = ?"),
        params![meeting_id, user_id],
        meeting_from_row,
    )
    .map_err(|err| match err {
        rusqlite::Error::QueryReturnedNoRows => {
            TimewiseError::NotFound(format!("meeting {meeting_id}"))
        }
        other => map_sql_error(other),
    })
}

fn fetch_task(conn: &DbConnection, user_id: i64, task_id: i64) -> Result<Task> {
    conn.query_row(
        &format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ? AND user_id = ?"),
        params![task_id, user_id],
        task_from_row,
    )
    .map_err(|err| match err {
        rusqlite::Error::QueryReturnedNoRows => {
            TimewiseError::NotFound(format!("task {task_id}"))
        }
        other => map_sql_error(other),
    })
}

fn meeting_from_row(row: &Row<'_>) -> rusqlite::Result<Meeting> {
    Ok(Meeting {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        location: row.get(4)?,
        start_time: datetime_from_ts(row.get(5)?),
        end_time: datetime_from_ts(row.get(6)?),
        created_at: datetime_from_ts(row.get(7)?),
        updated_at: datetime_from_ts(row.get(8)?),
    })
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let priority: String = row.get(4)?;
    let status: String = row.get(5)?;
    Ok(Task {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        priority: TaskPriority::parse(&priority).unwrap_or_default(),
        status: TaskStatus::parse(&status).unwrap_or_default(),
        start_time: row.get::<_, Option<i64>>(6)?.map(datetime_from_ts),
        end_time: row.get::<_, Option<i64>>(7)?.map(datetime_from_ts),
        created_at: datetime_from_ts(row.get(8)?),
        updated_at: datetime_from_ts(row.get(9)?),
    })
}

fn datetime_from_ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

pub(crate) fn map_join_error(err: task::JoinError) -> TimewiseError {
    TimewiseError::Internal(format!("blocking task failed: {err}"))
}
