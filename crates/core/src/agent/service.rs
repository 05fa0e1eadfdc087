//! The conversational orchestration loop.
//!
//! One call to [`AgentService::chat`] processes one user turn:
//! `Gate -> ContextUpdate -> Dispatch(0..N) -> Terminate`. The completion
//! service drives the Dispatch phase by requesting operations; this service
//! resolves time expressions, detects conflicts, proposes alternatives, and
//! manages the propose/confirm protocol for anything that cannot be
//! committed immediately. All cross-turn state lives in the injected stores;
//! nothing is kept in memory between turns.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use serde_json::{json, Value};
use timewise_domain::constants::{
    BUSINESS_DAY_START_HOUR, HISTORY_SCAN_TURNS, MAX_DISPATCH_ROUNDS, OUT_OF_SCOPE_REPLY,
    SLOT_SEARCH_HORIZON_DAYS,
};
use timewise_domain::{
    CalendarItem, ContextRecord, Interval, ItemKind, KindGuess, Meeting, MeetingDraft,
    MeetingPatch, PendingAction, Result, Role, Task, TaskDraft, TaskPatch, TaskPriority,
    TaskStatus, TimewiseError,
};
use tracing::{debug, info, instrument, warn};

use super::ports::{
    CalendarRepository, Clock, CompletionOutcome, CompletionPort, ConversationLogRepository,
    ItemFilter, OperationRequest, PromptMessage,
};
use super::tools;
use crate::availability::{
    busy_intervals, business_day_end, business_day_start, free_slots, is_available,
    next_available_slot,
};
use crate::context::ContextStore;
use crate::intent;
use crate::timeres::TimeResolver;

const DEFAULT_MEETING_MINUTES: i64 = 60;
const DEFAULT_SLOT_MINUTES: i64 = 30;
const MAX_ALTERNATIVES: usize = 3;

/// The conversational scheduling agent.
///
/// All collaborators are injected; the service holds no global handles and
/// no per-user in-memory state.
pub struct AgentService {
    completion: Arc<dyn CompletionPort>,
    calendar: Arc<dyn CalendarRepository>,
    log: Arc<dyn ConversationLogRepository>,
    state: Arc<dyn ContextStore>,
    resolver: TimeResolver,
    clock: Arc<dyn Clock>,
}

impl AgentService {
    pub fn new(
        completion: Arc<dyn CompletionPort>,
        calendar: Arc<dyn CalendarRepository>,
        log: Arc<dyn ConversationLogRepository>,
        state: Arc<dyn ContextStore>,
        resolver: TimeResolver,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { completion, calendar, log, state, resolver, clock }
    }

    /// Process one user message and return the assistant's reply.
    ///
    /// Every terminal reply is appended to the chat history before being
    /// returned. Collaborator outages surface as hard errors; conflict,
    /// past-time and no-match conditions stay inside the conversation.
    #[instrument(skip(self, message), fields(user_id))]
    pub async fn chat(&self, user_id: i64, message: &str) -> Result<String> {
        let now = self.clock.now();
        self.log.append(user_id, Role::User, message).await?;

        // Gate: confirmations pass through, they continue the
        // propose/confirm protocol started on an earlier turn.
        let confirmation = intent::is_confirmation(message);
        if !confirmation && !intent::is_scheduling_relevant(message) {
            debug!(user_id, "message not scheduling-relevant, short-circuiting");
            return self.finish(user_id, OUT_OF_SCOPE_REPLY.to_string()).await;
        }

        // ContextUpdate: confirmations consume context, they never write it.
        if !confirmation {
            self.update_context(user_id, message, now).await?;
        }

        // Dispatch
        let mut conversation = self.load_conversation(user_id).await?;
        let catalog = tools::catalog();
        let mut reply = None;

        for round in 0..MAX_DISPATCH_ROUNDS {
            let outcome =
                self.completion.complete(tools::SYSTEM_PROMPT, &conversation, &catalog).await?;
            match outcome {
                CompletionOutcome::Direct(text) => {
                    debug!(user_id, round, "completion returned a direct reply");
                    reply = Some(text);
                    break;
                }
                CompletionOutcome::Operations(ops) => {
                    info!(user_id, round, count = ops.len(), "executing requested operations");
                    conversation.push(PromptMessage::AssistantOperations(ops.clone()));
                    for op in ops {
                        let content = match self.execute_operation(user_id, now, &op).await {
                            Ok(value) => value.to_string(),
                            // A storage failure is a visible result for this
                            // one operation; remaining results still run.
                            Err(err) => {
                                warn!(user_id, op = %op.name, error = %err, "operation failed");
                                json!({ "error": err.to_string() }).to_string()
                            }
                        };
                        conversation.push(PromptMessage::OperationResult {
                            call_id: op.call_id,
                            name: op.name,
                            content,
                        });
                    }
                }
            }
        }

        let mut reply = reply.ok_or_else(|| {
            TimewiseError::Completion(format!(
                "completion service still requested operations after {MAX_DISPATCH_ROUNDS} rounds"
            ))
        })?;

        // Terminate: confirmations consult the pending action.
        if confirmation {
            if let Some(text) = self.resolve_confirmation(user_id).await? {
                return self.finish(user_id, text).await;
            }
            if reply.trim().is_empty() {
                reply = "There is nothing waiting for confirmation right now, but I'm happy to \
                     help with your schedule."
                    .to_string();
            }
        }

        if reply.trim().is_empty() {
            reply = "Done! Anything else I can schedule for you?".to_string();
        }
        self.finish(user_id, reply).await
    }

    /// Append the assistant reply to the log and hand it back.
    async fn finish(&self, user_id: i64, reply: String) -> Result<String> {
        self.log.append(user_id, Role::Assistant, &reply).await?;
        Ok(reply)
    }

    /// Recent history, oldest first, ending with the just-appended message.
    async fn load_conversation(&self, user_id: i64) -> Result<Vec<PromptMessage>> {
        let turns = self.log.recent(user_id, HISTORY_SCAN_TURNS).await?;
        Ok(turns
            .iter()
            .rev()
            .map(|turn| match turn.role {
                Role::User => PromptMessage::User(turn.content.clone()),
                Role::Assistant => PromptMessage::Assistant(turn.content.clone()),
            })
            .collect())
    }

    /// Write context memory for the kind(s) the message concerns, falling
    /// back to history inference for elliptical messages.
    async fn update_context(
        &self,
        user_id: i64,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let mut record = ContextRecord {
            title: intent::extract_referenced_title(message),
            date: intent::extract_referenced_date(message, &self.resolver, now),
        };
        if record.is_empty() {
            let turns = self.log.recent(user_id, HISTORY_SCAN_TURNS).await?;
            record = intent::infer_from_history(&turns, &self.resolver, now);
        }
        if record.is_empty() {
            return Ok(());
        }

        match intent::classify_kind(message) {
            KindGuess::Meeting => {
                self.state.set_context(user_id, ItemKind::Meeting, record).await
            }
            KindGuess::Task => self.state.set_context(user_id, ItemKind::Task, record).await,
            KindGuess::Ambiguous => {
                self.state.set_context(user_id, ItemKind::Meeting, record.clone()).await?;
                self.state.set_context(user_id, ItemKind::Task, record).await
            }
        }
    }

    /// Dispatch a single operation request. Unknown names and no-match
    /// lookups produce structured error results, never faults.
    async fn execute_operation(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
        op: &OperationRequest,
    ) -> Result<Value> {
        let args = &op.arguments;
        match op.name.as_str() {
            "create_meeting" => self.op_create_meeting(user_id, now, args).await,
            "update_meeting" => self.op_update_meeting(user_id, now, args).await,
            "delete_meeting" => self.op_delete_meeting(user_id, now, args).await,
            "list_meetings" => self.op_list_meetings(user_id, now, args).await,
            "create_task" => self.op_create_task(user_id, now, args).await,
            "update_task" => self.op_update_task(user_id, now, args).await,
            "delete_task" => self.op_delete_task(user_id, now, args).await,
            "list_tasks" => self.op_list_tasks(user_id, now, args).await,
            "get_free_time" => {
                self.op_free_time(user_id, now, args, ItemKind::Meeting).await
            }
            "get_free_time_for_task" => {
                self.op_free_time(user_id, now, args, ItemKind::Task).await
            }
            other => Ok(json!({ "error": format!("Unknown operation: {other}") })),
        }
    }

    async fn op_create_meeting(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
        args: &Value,
    ) -> Result<Value> {
        let ctx = self.state.get_context(user_id, ItemKind::Meeting).await?;
        let Some(title) = arg_str(args, "title").or_else(|| ctx.title.clone()) else {
            return Ok(json!({ "error": "Missing meeting title" }));
        };

        let Some(candidate) = self.resolve_window(
            args,
            now,
            ctx.date,
            DEFAULT_MEETING_MINUTES,
        ) else {
            return Ok(json!({ "error": "Could not understand the requested time" }));
        };

        let pending = PendingAction {
            kind: ItemKind::Meeting,
            title: title.clone(),
            description: arg_str(args, "description"),
            location: arg_str(args, "location"),
            priority: None,
            proposed_start: candidate.start,
            proposed_end: candidate.end,
        };

        if candidate.start < now {
            return self.defer_past_request(user_id, now, pending).await;
        }
        if let Some(result) = self.defer_conflict(user_id, pending, None).await? {
            return Ok(result);
        }

        let meeting = self
            .calendar
            .create_meeting(
                user_id,
                MeetingDraft {
                    title,
                    description: arg_str(args, "description"),
                    location: arg_str(args, "location"),
                    start_time: candidate.start,
                    end_time: candidate.end,
                },
            )
            .await?;
        info!(user_id, meeting_id = meeting.id, "meeting created");
        Ok(json!({ "status": "Meeting created", "meeting_id": meeting.id }))
    }

    async fn op_update_meeting(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
        args: &Value,
    ) -> Result<Value> {
        let ctx = self.state.get_context(user_id, ItemKind::Meeting).await?;
        let Some(meeting) = self.locate_meeting(user_id, args, &ctx).await? else {
            return Ok(json!({ "error": "No matching meeting found" }));
        };

        let new_start = arg_str(args, "start_time")
            .and_then(|expr| self.resolver.resolve(&expr, now));
        let new_end =
            arg_str(args, "end_time").and_then(|expr| self.resolver.resolve(&expr, now));

        let start = new_start.unwrap_or(meeting.start_time);
        let duration = meeting.end_time - meeting.start_time;
        let end = match (new_end, new_start) {
            (Some(end), _) if end > start => end,
            (_, Some(start)) => start + duration,
            _ => meeting.end_time,
        };
        let candidate = Interval::new(start, end);
        let times_changed = candidate != meeting.interval();

        if times_changed {
            let pending = PendingAction {
                kind: ItemKind::Meeting,
                title: arg_str(args, "title").unwrap_or_else(|| meeting.title.clone()),
                description: meeting.description.clone(),
                location: meeting.location.clone(),
                priority: None,
                proposed_start: candidate.start,
                proposed_end: candidate.end,
            };
            if candidate.start < now {
                return self.defer_past_request(user_id, now, pending).await;
            }
            if let Some(result) =
                self.defer_conflict(user_id, pending, Some(meeting.id)).await?
            {
                return Ok(result);
            }
        }

        let updated = self
            .calendar
            .update_meeting(
                user_id,
                meeting.id,
                MeetingPatch {
                    title: arg_str(args, "title"),
                    description: arg_str(args, "description"),
                    location: arg_str(args, "location"),
                    start_time: times_changed.then_some(candidate.start),
                    end_time: times_changed.then_some(candidate.end),
                },
            )
            .await?;
        info!(user_id, meeting_id = updated.id, "meeting updated");
        Ok(json!({ "status": "Meeting updated", "meeting_id": updated.id }))
    }

    async fn op_delete_meeting(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
        args: &Value,
    ) -> Result<Value> {
        let ctx = self.state.get_context(user_id, ItemKind::Meeting).await?;
        let located = match self.locate_meeting(user_id, args, &ctx).await? {
            Some(meeting) => Some(meeting),
            None => {
                // Date-only deletion: the sole meeting on the referenced day.
                match self.referenced_date(args, now, &ctx) {
                    Some(date) => {
                        let meetings = self
                            .calendar
                            .find_meetings(user_id, &ItemFilter::in_range(day_range(date)))
                            .await?;
                        meetings.into_iter().next()
                    }
                    None => None,
                }
            }
        };
        let Some(meeting) = located else {
            return Ok(json!({ "error": "No matching meeting found" }));
        };

        self.calendar.delete_meeting(user_id, meeting.id).await?;
        info!(user_id, meeting_id = meeting.id, "meeting deleted");
        Ok(json!({ "status": "Meeting deleted", "meeting_id": meeting.id, "title": meeting.title }))
    }

    async fn op_list_meetings(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
        args: &Value,
    ) -> Result<Value> {
        let ctx = self.state.get_context(user_id, ItemKind::Meeting).await?;
        let filter = match self.referenced_date(args, now, &ctx) {
            Some(date) => ItemFilter::in_range(day_range(date)),
            None => ItemFilter::default(),
        };
        let meetings = self.calendar.find_meetings(user_id, &filter).await?;
        let listed: Vec<Value> = meetings
            .iter()
            .map(|m| {
                json!({
                    "meeting_id": m.id,
                    "title": m.title,
                    "start_time": m.start_time.to_rfc3339(),
                    "end_time": m.end_time.to_rfc3339(),
                    "location": m.location,
                })
            })
            .collect();
        Ok(json!({ "meetings": listed }))
    }

    async fn op_create_task(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
        args: &Value,
    ) -> Result<Value> {
        let ctx = self.state.get_context(user_id, ItemKind::Task).await?;
        let Some(title) = arg_str(args, "title").or_else(|| ctx.title.clone()) else {
            return Ok(json!({ "error": "Missing task title" }));
        };
        let priority = arg_str(args, "priority")
            .and_then(|p| TaskPriority::parse(&p))
            .unwrap_or_default();

        let start =
            arg_str(args, "start_time").and_then(|expr| self.resolver.resolve(&expr, now));
        let end = arg_str(args, "end_time").and_then(|expr| self.resolver.resolve(&expr, now));
        let window = match (start, end) {
            (Some(start), Some(end)) if end > start => Some(Interval::new(start, end)),
            (Some(start), _) => {
                Some(Interval::new(start, start + Duration::minutes(DEFAULT_SLOT_MINUTES)))
            }
            _ => None,
        };

        if let Some(candidate) = window {
            let pending = PendingAction {
                kind: ItemKind::Task,
                title: title.clone(),
                description: arg_str(args, "description"),
                location: None,
                priority: Some(priority),
                proposed_start: candidate.start,
                proposed_end: candidate.end,
            };
            if candidate.start < now {
                return self.defer_past_request(user_id, now, pending).await;
            }
            if let Some(result) = self.defer_conflict(user_id, pending, None).await? {
                return Ok(result);
            }
        }

        let task = self
            .calendar
            .create_task(
                user_id,
                TaskDraft {
                    title,
                    description: arg_str(args, "description"),
                    priority,
                    start_time: window.map(|w| w.start),
                    end_time: window.map(|w| w.end),
                },
            )
            .await?;
        info!(user_id, task_id = task.id, "task created");
        Ok(json!({ "status": "Task created", "task_id": task.id }))
    }

    async fn op_update_task(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
        args: &Value,
    ) -> Result<Value> {
        let ctx = self.state.get_context(user_id, ItemKind::Task).await?;
        let Some(task) = self.locate_task(user_id, args, &ctx).await? else {
            return Ok(json!({ "error": "No matching task found" }));
        };

        let new_start = arg_str(args, "start_time")
            .and_then(|expr| self.resolver.resolve(&expr, now));
        let new_end =
            arg_str(args, "end_time").and_then(|expr| self.resolver.resolve(&expr, now));
        let window = match (new_start.or(task.start_time), new_end.or(task.end_time)) {
            (Some(start), Some(end)) if end > start => Some(Interval::new(start, end)),
            (Some(start), _) => {
                Some(Interval::new(start, start + Duration::minutes(DEFAULT_SLOT_MINUTES)))
            }
            _ => None,
        };
        let times_changed = window != task.interval() && (new_start.is_some() || new_end.is_some());

        if times_changed {
            if let Some(candidate) = window {
                let pending = PendingAction {
                    kind: ItemKind::Task,
                    title: arg_str(args, "title").unwrap_or_else(|| task.title.clone()),
                    description: task.description.clone(),
                    location: None,
                    priority: Some(task.priority),
                    proposed_start: candidate.start,
                    proposed_end: candidate.end,
                };
                if candidate.start < now {
                    return self.defer_past_request(user_id, now, pending).await;
                }
                if let Some(result) =
                    self.defer_conflict(user_id, pending, Some(task.id)).await?
                {
                    return Ok(result);
                }
            }
        }

        let updated = self
            .calendar
            .update_task(
                user_id,
                task.id,
                TaskPatch {
                    title: arg_str(args, "title"),
                    description: arg_str(args, "description"),
                    priority: arg_str(args, "priority").and_then(|p| TaskPriority::parse(&p)),
                    status: arg_str(args, "status").and_then(|s| TaskStatus::parse(&s)),
                    start_time: (times_changed && window.is_some())
                        .then(|| window.map(|w| w.start))
                        .flatten(),
                    end_time: (times_changed && window.is_some())
                        .then(|| window.map(|w| w.end))
                        .flatten(),
                },
            )
            .await?;
        info!(user_id, task_id = updated.id, "task updated");
        Ok(json!({ "status": "Task updated", "task_id": updated.id }))
    }

    async fn op_delete_task(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
        args: &Value,
    ) -> Result<Value> {
        let ctx = self.state.get_context(user_id, ItemKind::Task).await?;
        let located = match self.locate_task(user_id, args, &ctx).await? {
            Some(task) => Some(task),
            None => match self.referenced_date(args, now, &ctx) {
                Some(date) => {
                    let tasks = self
                        .calendar
                        .find_tasks(user_id, &ItemFilter::in_range(day_range(date)))
                        .await?;
                    tasks.into_iter().next()
                }
                None => None,
            },
        };
        let Some(task) = located else {
            return Ok(json!({ "error": "No matching task found" }));
        };

        self.calendar.delete_task(user_id, task.id).await?;
        info!(user_id, task_id = task.id, "task deleted");
        Ok(json!({ "status": "Task deleted", "task_id": task.id, "title": task.title }))
    }

    async fn op_list_tasks(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
        args: &Value,
    ) -> Result<Value> {
        let ctx = self.state.get_context(user_id, ItemKind::Task).await?;
        let filter = match self.referenced_date(args, now, &ctx) {
            Some(date) => ItemFilter::in_range(day_range(date)),
            None => ItemFilter::default(),
        };
        let tasks = self.calendar.find_tasks(user_id, &filter).await?;
        let listed: Vec<Value> = tasks
            .iter()
            .map(|t| {
                json!({
                    "task_id": t.id,
                    "title": t.title,
                    "priority": t.priority.as_str(),
                    "status": t.status.as_str(),
                    "start_time": t.start_time.map(|s| s.to_rfc3339()),
                    "end_time": t.end_time.map(|e| e.to_rfc3339()),
                })
            })
            .collect();
        Ok(json!({ "tasks": listed }))
    }

    async fn op_free_time(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
        args: &Value,
        kind: ItemKind,
    ) -> Result<Value> {
        let ctx = self.state.get_context(user_id, kind).await?;
        let Some(date) = self.referenced_date(args, now, &ctx) else {
            return Ok(json!({ "error": "Missing or unparsable date" }));
        };
        let duration = arg_i64(args, "duration_minutes").unwrap_or(DEFAULT_SLOT_MINUTES);

        let items = self.items_in_range(user_id, day_range(date)).await?;
        let busy = busy_intervals(&items, None);
        let slots: Vec<Value> = free_slots(&busy, date, duration)
            .iter()
            .map(|slot| {
                json!({ "start": slot.start.to_rfc3339(), "end": slot.end.to_rfc3339() })
            })
            .collect();
        Ok(json!({ "free_slots": slots }))
    }

    /// Resolve the requested start/end window for a creation request.
    /// Falls back to the context date (at business-day start) when no start
    /// expression was given, and to a default duration when the end is
    /// missing or unparsable.
    fn resolve_window(
        &self,
        args: &Value,
        now: DateTime<Utc>,
        context_date: Option<NaiveDate>,
        default_minutes: i64,
    ) -> Option<Interval> {
        let start = match arg_str(args, "start_time") {
            Some(expr) => self.resolver.resolve(&expr, now)?,
            None => {
                let date = context_date?;
                let time = NaiveTime::from_hms_opt(BUSINESS_DAY_START_HOUR, 0, 0)?;
                date.and_time(time).and_utc()
            }
        };
        let end = arg_str(args, "end_time")
            .and_then(|expr| self.resolver.resolve(&expr, now))
            .filter(|end| *end > start)
            .unwrap_or(start + Duration::minutes(default_minutes));
        Some(Interval::new(start, end))
    }

    /// Past-time protocol: never auto-executes. Store a draft pushed to the
    /// same time of day tomorrow, and return an error-with-suggestion result
    /// that the completion service relays to the user.
    async fn defer_past_request(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
        mut pending: PendingAction,
    ) -> Result<Value> {
        let duration = pending.proposed_end - pending.proposed_start;
        let suggested_start = (now.date_naive() + Duration::days(1))
            .and_time(pending.proposed_start.time())
            .and_utc();
        pending.proposed_start = suggested_start;
        pending.proposed_end = suggested_start + duration;

        let kind = pending.kind;
        let suggestion = json!({
            "start_time": pending.proposed_start.to_rfc3339(),
            "end_time": pending.proposed_end.to_rfc3339(),
        });
        self.state.set_pending(user_id, kind, pending).await?;
        debug!(user_id, kind = kind.as_str(), "past-time request deferred to pending action");

        Ok(json!({
            "error": "Requested start time is in the past",
            "suggestion": suggestion,
            "note": "Ask the user to confirm the suggested time; it is held as a pending action.",
        }))
    }

    /// Conflict protocol: when the proposed window is taken, store the draft
    /// as the kind's pending action and return an alternatives result.
    /// Returns `None` when the window is free.
    async fn defer_conflict(
        &self,
        user_id: i64,
        pending: PendingAction,
        exclude_id: Option<i64>,
    ) -> Result<Option<Value>> {
        let candidate = Interval::new(pending.proposed_start, pending.proposed_end);
        let items = self.items_in_range(user_id, candidate).await?;
        let busy = busy_intervals(&items, exclude_id);
        if is_available(&busy, &candidate) {
            return Ok(None);
        }

        let alternatives = self.propose_alternatives(user_id, candidate, exclude_id).await?;
        let kind = pending.kind;
        let mut pending = pending;
        // Hold the first alternative so a bare "yes" commits something that
        // can actually be booked.
        if let Some(first) = alternatives.first() {
            pending.proposed_start = first.start;
            pending.proposed_end = first.end;
        }
        self.state.set_pending(user_id, kind, pending).await?;
        debug!(user_id, kind = kind.as_str(), "conflicting request deferred to pending action");

        let listed: Vec<Value> = alternatives
            .iter()
            .map(|slot| {
                json!({ "start": slot.start.to_rfc3339(), "end": slot.end.to_rfc3339() })
            })
            .collect();
        Ok(Some(json!({
            "error": "Time slot conflict",
            "alternatives": listed,
            "note": "Offer the alternatives to the user; the first one is held as a pending action.",
        })))
    }

    /// Same-day free slots first; when the day is fully booked, escalate
    /// day by day across the bounded search horizon.
    async fn propose_alternatives(
        &self,
        user_id: i64,
        candidate: Interval,
        exclude_id: Option<i64>,
    ) -> Result<Vec<Interval>> {
        let duration = candidate.duration_minutes().max(DEFAULT_SLOT_MINUTES);
        let day = candidate.start.date_naive();
        let horizon = Interval::new(
            business_day_start(day),
            business_day_end(day + Duration::days(SLOT_SEARCH_HORIZON_DAYS - 1)),
        );
        let items = self.items_in_range(user_id, horizon).await?;
        let busy = busy_intervals(&items, exclude_id);

        let same_day = free_slots(&busy, day, duration);
        if !same_day.is_empty() {
            return Ok(same_day.into_iter().take(MAX_ALTERNATIVES).collect());
        }
        Ok(next_available_slot(&busy, duration, business_day_start(day))
            .into_iter()
            .collect())
    }

    /// Confirmation protocol: commit the pending action if its slot is still
    /// open, otherwise offer fresh alternatives without committing. `None`
    /// when no pending action exists for either kind.
    async fn resolve_confirmation(&self, user_id: i64) -> Result<Option<String>> {
        for kind in [ItemKind::Meeting, ItemKind::Task] {
            let Some(pending) = self.state.get_pending(user_id, kind).await? else {
                continue;
            };
            let candidate = Interval::new(pending.proposed_start, pending.proposed_end);
            let items = self.items_in_range(user_id, candidate).await?;
            let busy = busy_intervals(&items, None);

            if !is_available(&busy, &candidate) {
                let alternatives =
                    self.propose_alternatives(user_id, candidate, None).await?;
                return Ok(Some(format_alternatives(&pending.title, &alternatives)));
            }

            self.commit_pending(user_id, &pending).await?;
            self.state.clear_pending(user_id, kind).await?;
            info!(user_id, kind = kind.as_str(), "pending action committed");
            return Ok(Some(format!(
                "Scheduled \"{}\" for {}.",
                pending.title,
                format_slot(&candidate)
            )));
        }
        Ok(None)
    }

    /// Commit a confirmed draft: reschedule the matching existing item when
    /// one exists under the same title, otherwise create a new one.
    async fn commit_pending(&self, user_id: i64, pending: &PendingAction) -> Result<()> {
        match pending.kind {
            ItemKind::Meeting => {
                let existing = self
                    .calendar
                    .find_meetings(user_id, &ItemFilter::by_title(pending.title.clone()))
                    .await?
                    .into_iter()
                    .find(|m| m.title.eq_ignore_ascii_case(&pending.title));
                match existing {
                    Some(meeting) => {
                        self.calendar
                            .update_meeting(
                                user_id,
                                meeting.id,
                                MeetingPatch {
                                    start_time: Some(pending.proposed_start),
                                    end_time: Some(pending.proposed_end),
                                    ..MeetingPatch::default()
                                },
                            )
                            .await?;
                    }
                    None => {
                        self.calendar
                            .create_meeting(
                                user_id,
                                MeetingDraft {
                                    title: pending.title.clone(),
                                    description: pending.description.clone(),
                                    location: pending.location.clone(),
                                    start_time: pending.proposed_start,
                                    end_time: pending.proposed_end,
                                },
                            )
                            .await?;
                    }
                }
            }
            ItemKind::Task => {
                let existing = self
                    .calendar
                    .find_tasks(user_id, &ItemFilter::by_title(pending.title.clone()))
                    .await?
                    .into_iter()
                    .find(|t| t.title.eq_ignore_ascii_case(&pending.title));
                match existing {
                    Some(task) => {
                        self.calendar
                            .update_task(
                                user_id,
                                task.id,
                                TaskPatch {
                                    start_time: Some(pending.proposed_start),
                                    end_time: Some(pending.proposed_end),
                                    ..TaskPatch::default()
                                },
                            )
                            .await?;
                    }
                    None => {
                        self.calendar
                            .create_task(
                                user_id,
                                TaskDraft {
                                    title: pending.title.clone(),
                                    description: pending.description.clone(),
                                    priority: pending.priority.unwrap_or_default(),
                                    start_time: Some(pending.proposed_start),
                                    end_time: Some(pending.proposed_end),
                                },
                            )
                            .await?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Meetings and timed tasks overlapping `range`, as calendar items.
    async fn items_in_range(&self, user_id: i64, range: Interval) -> Result<Vec<CalendarItem>> {
        let filter = ItemFilter::in_range(range);
        let meetings = self.calendar.find_meetings(user_id, &filter).await?;
        let tasks = self.calendar.find_tasks(user_id, &filter).await?;
        Ok(meetings
            .into_iter()
            .map(CalendarItem::Meeting)
            .chain(tasks.into_iter().map(CalendarItem::Task))
            .collect())
    }

    /// Locate a meeting by id, then explicit title, then context title.
    async fn locate_meeting(
        &self,
        user_id: i64,
        args: &Value,
        ctx: &ContextRecord,
    ) -> Result<Option<Meeting>> {
        if let Some(id) = arg_i64(args, "meeting_id") {
            let found =
                self.calendar.find_meetings(user_id, &ItemFilter::by_id(id)).await?;
            return Ok(found.into_iter().next());
        }
        if let Some(title) = arg_str(args, "title").or_else(|| ctx.title.clone()) {
            let found =
                self.calendar.find_meetings(user_id, &ItemFilter::by_title(title)).await?;
            return Ok(found.into_iter().next());
        }
        Ok(None)
    }

    /// Locate a task by id, then explicit title, then context title.
    async fn locate_task(
        &self,
        user_id: i64,
        args: &Value,
        ctx: &ContextRecord,
    ) -> Result<Option<Task>> {
        if let Some(id) = arg_i64(args, "task_id") {
            let found = self.calendar.find_tasks(user_id, &ItemFilter::by_id(id)).await?;
            return Ok(found.into_iter().next());
        }
        if let Some(title) = arg_str(args, "title").or_else(|| ctx.title.clone()) {
            let found =
                self.calendar.find_tasks(user_id, &ItemFilter::by_title(title)).await?;
            return Ok(found.into_iter().next());
        }
        Ok(None)
    }

    /// The date an operation refers to: its `date` argument when present and
    /// parsable, else the context date.
    fn referenced_date(
        &self,
        args: &Value,
        now: DateTime<Utc>,
        ctx: &ContextRecord,
    ) -> Option<NaiveDate> {
        arg_str(args, "date")
            .and_then(|expr| self.resolver.resolve(&expr, now))
            .map(|instant| instant.date_naive())
            .or(ctx.date)
    }
}

/// Non-empty string argument.
fn arg_str(args: &Value, key: &str) -> Option<String> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

fn arg_i64(args: &Value, key: &str) -> Option<i64> {
    let value = args.get(key)?;
    value.as_i64().or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

fn day_range(date: NaiveDate) -> Interval {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    Interval::new(start, start + Duration::days(1))
}

fn format_slot(interval: &Interval) -> String {
    format!(
        "{} to {}",
        interval.start.format("%Y-%m-%d %H:%M"),
        interval.end.format("%H:%M")
    )
}

fn format_alternatives(title: &str, alternatives: &[Interval]) -> String {
    if alternatives.is_empty() {
        return format!(
            "That time is no longer available for \"{title}\", and I could not find an open \
             slot in the next week. Would another week work?"
        );
    }
    let listed: Vec<String> = alternatives.iter().map(format_slot).collect();
    format!(
        "That time is no longer available for \"{title}\". How about: {}?",
        listed.join(", or ")
    )
}
