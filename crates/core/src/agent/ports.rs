//! Port interfaces for the orchestration loop's collaborators.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use timewise_domain::{
    ConversationTurn, Interval, Meeting, MeetingDraft, MeetingPatch, Result, Role, Task,
    TaskDraft, TaskPatch,
};

/// One message in the prompt sent to the completion service.
#[derive(Debug, Clone)]
pub enum PromptMessage {
    User(String),
    Assistant(String),
    /// The assistant requested operations in a previous round.
    AssistantOperations(Vec<OperationRequest>),
    /// Result of one executed operation, fed back into the next round.
    OperationResult { call_id: String, name: String, content: String },
}

/// A structured operation request returned by the completion service.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationRequest {
    /// Correlation id assigned by the completion service.
    pub call_id: String,
    /// Operation name; must be one of the catalog's declared names.
    pub name: String,
    /// Argument map matching the operation's declared schema.
    pub arguments: Value,
}

/// Outcome of one completion round.
#[derive(Debug, Clone)]
pub enum CompletionOutcome {
    /// A final natural-language reply; may be empty.
    Direct(String),
    /// One or more operation requests to execute.
    Operations(Vec<OperationRequest>),
}

/// A declared operation the completion service may request.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    /// JSON schema of the argument map.
    pub parameters: Value,
}

/// Natural-language completion collaborator.
#[async_trait]
pub trait CompletionPort: Send + Sync {
    /// Run one completion round over the conversation so far.
    async fn complete(
        &self,
        system_prompt: &str,
        conversation: &[PromptMessage],
        tools: &[ToolSpec],
    ) -> Result<CompletionOutcome>;
}

/// Filter for locating calendar items. All present fields must match; the
/// title match is a case-insensitive substring.
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub id: Option<i64>,
    pub title: Option<String>,
    pub range: Option<Interval>,
}

impl ItemFilter {
    pub fn by_id(id: i64) -> Self {
        Self { id: Some(id), ..Self::default() }
    }

    pub fn by_title(title: impl Into<String>) -> Self {
        Self { title: Some(title.into()), ..Self::default() }
    }

    pub fn in_range(range: Interval) -> Self {
        Self { range: Some(range), ..Self::default() }
    }
}

/// CRUD over calendar items, scoped by owner.
#[async_trait]
pub trait CalendarRepository: Send + Sync {
    async fn create_meeting(&self, user_id: i64, draft: MeetingDraft) -> Result<Meeting>;

    /// Apply a partial update; `NotFound` when the meeting does not exist
    /// for this owner.
    async fn update_meeting(
        &self,
        user_id: i64,
        meeting_id: i64,
        patch: MeetingPatch,
    ) -> Result<Meeting>;

    async fn delete_meeting(&self, user_id: i64, meeting_id: i64) -> Result<()>;

    /// Meetings matching the filter, ordered by start time.
    async fn find_meetings(&self, user_id: i64, filter: &ItemFilter) -> Result<Vec<Meeting>>;

    async fn create_task(&self, user_id: i64, draft: TaskDraft) -> Result<Task>;

    async fn update_task(&self, user_id: i64, task_id: i64, patch: TaskPatch) -> Result<Task>;

    async fn delete_task(&self, user_id: i64, task_id: i64) -> Result<()>;

    /// Tasks matching the filter. The range filter only matches tasks with
    /// both time bounds set.
    async fn find_tasks(&self, user_id: i64, filter: &ItemFilter) -> Result<Vec<Task>>;
}

/// Append-only conversation log, queryable by recency.
#[async_trait]
pub trait ConversationLogRepository: Send + Sync {
    /// Append one turn; ids are assigned monotonically by the store.
    async fn append(&self, user_id: i64, role: Role, content: &str) -> Result<ConversationTurn>;

    /// The most recent `limit` turns for a user, newest first.
    async fn recent(&self, user_id: i64, limit: usize) -> Result<Vec<ConversationTurn>>;
}

/// Source of "now". Injected so turns are deterministic under test.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock implementation of [`Clock`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
