use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use timewise_core::agent::ports::{
    CalendarRepository, ConversationLogRepository, ItemFilter,
};
use timewise_core::ContextStore;
use timewise_domain::{
    ContextRecord, ConversationTurn, ItemKind, Meeting, MeetingDraft, MeetingPatch,
    PendingAction, Result, Role, Task, TaskDraft, TaskPatch, TaskStatus, TimewiseError,
};

/// In-memory calendar repository.
///
/// Assigns sequential ids and honours the same filter semantics the SQLite
/// adapter does: id exact, title case-insensitive substring, range overlap
/// against the item's busy interval (untimed tasks never match a range).
#[derive(Default, Clone)]
pub struct InMemoryCalendar {
    state: Arc<Mutex<CalendarState>>,
}

#[derive(Default)]
struct CalendarState {
    meetings: Vec<Meeting>,
    tasks: Vec<Task>,
    next_id: i64,
    fail_writes: bool,
}

impl InMemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a meeting directly, bypassing the repository interface.
    pub fn with_meeting(self, user_id: i64, draft: MeetingDraft) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let meeting = state.meeting_from(user_id, draft);
            state.meetings.push(meeting);
        }
        self
    }

    /// Make every write fail with a database error.
    pub fn failing_writes(self) -> Self {
        self.state.lock().unwrap().fail_writes = true;
        self
    }

    pub fn meetings(&self) -> Vec<Meeting> {
        self.state.lock().unwrap().meetings.clone()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state.lock().unwrap().tasks.clone()
    }
}

impl CalendarState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn meeting_from(&mut self, user_id: i64, draft: MeetingDraft) -> Meeting {
        let now = Utc::now();
        Meeting {
            id: self.next_id(),
            user_id,
            title: draft.title,
            description: draft.description,
            location: draft.location,
            start_time: draft.start_time,
            end_time: draft.end_time,
            created_at: now,
            updated_at: now,
        }
    }

    fn check_writes(&self) -> Result<()> {
        if self.fail_writes {
            return Err(TimewiseError::Database("simulated write failure".to_string()));
        }
        Ok(())
    }
}

fn meeting_matches(meeting: &Meeting, filter: &ItemFilter) -> bool {
    if let Some(id) = filter.id {
        if meeting.id != id {
            return false;
        }
    }
    if let Some(title) = &filter.title {
        if !meeting.title.to_lowercase().contains(&title.to_lowercase()) {
            return false;
        }
    }
    if let Some(range) = &filter.range {
        if !meeting.interval().overlaps(range) {
            return false;
        }
    }
    true
}

fn task_matches(task: &Task, filter: &ItemFilter) -> bool {
    if let Some(id) = filter.id {
        if task.id != id {
            return false;
        }
    }
    if let Some(title) = &filter.title {
        if !task.title.to_lowercase().contains(&title.to_lowercase()) {
            return false;
        }
    }
    if let Some(range) = &filter.range {
        match task.interval() {
            Some(interval) if interval.overlaps(range) => {}
            _ => return false,
        }
    }
    true
}

#[async_trait]
impl CalendarRepository for InMemoryCalendar {
    async fn create_meeting(&self, user_id: i64, draft: MeetingDraft) -> Result<Meeting> {
        let mut state = self.state.lock().unwrap();
        state.check_writes()?;
        let meeting = state.meeting_from(user_id, draft);
        state.meetings.push(meeting.clone());
        Ok(meeting)
    }

    async fn update_meeting(
        &self,
        user_id: i64,
        meeting_id: i64,
        patch: MeetingPatch,
    ) -> Result<Meeting> {
        let mut state = self.state.lock().unwrap();
        state.check_writes()?;
        let meeting = state
            .meetings
            .iter_mut()
            .find(|m| m.id == meeting_id && m.user_id == user_id)
            .ok_or_else(|| TimewiseError::NotFound(format!("meeting {meeting_id}")))?;
        if let Some(title) = patch.title {
            meeting.title = title;
        }
        if let Some(description) = patch.description {
            meeting.description = Some(description);
        }
        if let Some(location) = patch.location {
            meeting.location = Some(location);
        }
        if let Some(start) = patch.start_time {
            meeting.start_time = start;
        }
        if let Some(end) = patch.end_time {
            meeting.end_time = end;
        }
        meeting.updated_at = Utc::now();
        Ok(meeting.clone())
    }

    async fn delete_meeting(&self, user_id: i64, meeting_id: i64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.check_writes()?;
        state.meetings.retain(|m| !(m.id == meeting_id && m.user_id == user_id));
        Ok(())
    }

    async fn find_meetings(&self, user_id: i64, filter: &ItemFilter) -> Result<Vec<Meeting>> {
        let state = self.state.lock().unwrap();
        let mut found: Vec<Meeting> = state
            .meetings
            .iter()
            .filter(|m| m.user_id == user_id && meeting_matches(m, filter))
            .cloned()
            .collect();
        found.sort_by_key(|m| m.start_time);
        Ok(found)
    }

    async fn create_task(&self, user_id: i64, draft: TaskDraft) -> Result<Task> {
        let mut state = self.state.lock().unwrap();
        state.check_writes()?;
        let now = Utc::now();
        let task = Task {
            id: state.next_id(),
            user_id,
            title: draft.title,
            description: draft.description,
            priority: draft.priority,
            status: TaskStatus::default(),
            start_time: draft.start_time,
            end_time: draft.end_time,
            created_at: now,
            updated_at: now,
        };
        state.tasks.push(task.clone());
        Ok(task)
    }

    async fn update_task(&self, user_id: i64, task_id: i64, patch: TaskPatch) -> Result<Task> {
        let mut state = self.state.lock().unwrap();
        state.check_writes()?;
        let task = state
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id && t.user_id == user_id)
            .ok_or_else(|| TimewiseError::NotFound(format!("task {task_id}")))?;
        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(description) = patch.description {
            task.description = Some(description);
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(status) = patch.status {
            task.status = status;
        }
        if let Some(start) = patch.start_time {
            task.start_time = Some(start);
        }
        if let Some(end) = patch.end_time {
            task.end_time = Some(end);
        }
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn delete_task(&self, user_id: i64, task_id: i64) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.check_writes()?;
        state.tasks.retain(|t| !(t.id == task_id && t.user_id == user_id));
        Ok(())
    }

    async fn find_tasks(&self, user_id: i64, filter: &ItemFilter) -> Result<Vec<Task>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .tasks
            .iter()
            .filter(|t| t.user_id == user_id && task_matches(t, filter))
            .cloned()
            .collect())
    }
}

/// In-memory chat log with sequential turn ids.
#[derive(Default, Clone)]
pub struct InMemoryConversationLog {
    turns: Arc<Mutex<Vec<ConversationTurn>>>,
}

impl InMemoryConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> Vec<ConversationTurn> {
        self.turns.lock().unwrap().clone()
    }
}

#[async_trait]
impl ConversationLogRepository for InMemoryConversationLog {
    async fn append(&self, user_id: i64, role: Role, content: &str) -> Result<ConversationTurn> {
        let mut turns = self.turns.lock().unwrap();
        let turn = ConversationTurn {
            id: turns.len() as i64 + 1,
            user_id,
            role,
            content: content.to_string(),
            timestamp: Utc::now(),
        };
        turns.push(turn.clone());
        Ok(turn)
    }

    async fn recent(&self, user_id: i64, limit: usize) -> Result<Vec<ConversationTurn>> {
        let turns = self.turns.lock().unwrap();
        Ok(turns
            .iter()
            .rev()
            .filter(|t| t.user_id == user_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

/// In-memory context/pending-action store keyed by (user, kind).
#[derive(Default, Clone)]
pub struct InMemoryContextStore {
    contexts: Arc<Mutex<HashMap<(i64, ItemKind), ContextRecord>>>,
    pending: Arc<Mutex<HashMap<(i64, ItemKind), PendingAction>>>,
}

impl InMemoryContextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn context(&self, user_id: i64, kind: ItemKind) -> Option<ContextRecord> {
        self.contexts.lock().unwrap().get(&(user_id, kind)).cloned()
    }

    pub fn pending(&self, user_id: i64, kind: ItemKind) -> Option<PendingAction> {
        self.pending.lock().unwrap().get(&(user_id, kind)).cloned()
    }

    pub fn seed_pending(&self, user_id: i64, action: PendingAction) {
        self.pending.lock().unwrap().insert((user_id, action.kind), action);
    }
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    async fn set_context(
        &self,
        user_id: i64,
        kind: ItemKind,
        record: ContextRecord,
    ) -> Result<()> {
        self.contexts.lock().unwrap().insert((user_id, kind), record);
        Ok(())
    }

    async fn get_context(&self, user_id: i64, kind: ItemKind) -> Result<ContextRecord> {
        Ok(self.context(user_id, kind).unwrap_or_default())
    }

    async fn set_pending(
        &self,
        user_id: i64,
        kind: ItemKind,
        action: PendingAction,
    ) -> Result<()> {
        self.pending.lock().unwrap().insert((user_id, kind), action);
        Ok(())
    }

    async fn get_pending(&self, user_id: i64, kind: ItemKind) -> Result<Option<PendingAction>> {
        Ok(self.pending(user_id, kind))
    }

    async fn clear_pending(&self, user_id: i64, kind: ItemKind) -> Result<()> {
        self.pending.lock().unwrap().remove(&(user_id, kind));
        Ok(())
    }
}
