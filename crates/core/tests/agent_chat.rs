//! End-to-end conversation tests for the orchestration loop, over in-memory
//! ports and a scripted completion service.

mod support;

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::json;
use timewise_core::agent::ports::{CompletionOutcome, OperationRequest, PromptMessage};
use timewise_core::AgentService;
use timewise_domain::constants::{MAX_DISPATCH_ROUNDS, OUT_OF_SCOPE_REPLY};
use timewise_domain::{ItemKind, MeetingDraft, PendingAction, Role, TimewiseError};

use support::clock::{resolver_with, FixedClock, MappedParser};
use support::completion::ScriptedCompletion;
use support::store::{InMemoryCalendar, InMemoryConversationLog, InMemoryContextStore};

const USER: i64 = 7;

fn at(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, day, hour, minute, 0).unwrap()
}

fn op(name: &str, arguments: serde_json::Value) -> OperationRequest {
    OperationRequest {
        call_id: format!("call-{name}"),
        name: name.to_string(),
        arguments,
    }
}

struct Harness {
    service: AgentService,
    completion: Arc<ScriptedCompletion>,
    calendar: InMemoryCalendar,
    log: InMemoryConversationLog,
    state: InMemoryContextStore,
}

fn harness(
    completion: ScriptedCompletion,
    calendar: InMemoryCalendar,
    parser: MappedParser,
    now: DateTime<Utc>,
) -> Harness {
    let completion = Arc::new(completion);
    let log = InMemoryConversationLog::new();
    let state = InMemoryContextStore::new();
    let service = AgentService::new(
        completion.clone(),
        Arc::new(calendar.clone()),
        Arc::new(log.clone()),
        Arc::new(state.clone()),
        resolver_with(parser),
        Arc::new(FixedClock(now)),
    );
    Harness { service, completion, calendar, log, state }
}

#[tokio::test]
async fn irrelevant_message_gets_capability_reply_without_completion_call() {
    let h = harness(
        ScriptedCompletion::new(vec![]),
        InMemoryCalendar::new(),
        MappedParser::new(),
        at(2, 10, 0),
    );

    let reply = h.service.chat(USER, "tell me a joke").await.unwrap();

    assert_eq!(reply, OUT_OF_SCOPE_REPLY);
    assert_eq!(h.completion.calls(), 0);
    let turns = h.log.turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[1].role, Role::Assistant);
    assert_eq!(turns[1].content, OUT_OF_SCOPE_REPLY);
}

#[tokio::test]
async fn create_meeting_commits_when_slot_is_free() {
    let parser = MappedParser::new().with("tomorrow at 3pm", at(3, 15, 0));
    let h = harness(
        ScriptedCompletion::new(vec![
            CompletionOutcome::Operations(vec![op(
                "create_meeting",
                json!({ "title": "Standup", "start_time": "tomorrow at 3pm" }),
            )]),
            CompletionOutcome::Direct("Standup is booked for tomorrow at 3 PM.".to_string()),
        ]),
        InMemoryCalendar::new(),
        parser,
        at(2, 10, 0),
    );

    let reply = h
        .service
        .chat(USER, "Schedule a meeting tomorrow at 3pm titled Standup")
        .await
        .unwrap();

    assert_eq!(reply, "Standup is booked for tomorrow at 3 PM.");
    let meetings = h.calendar.meetings();
    assert_eq!(meetings.len(), 1);
    assert_eq!(meetings[0].title, "Standup");
    assert_eq!(meetings[0].start_time, at(3, 15, 0));
    assert_eq!(meetings[0].end_time, at(3, 16, 0));
    // the operation result fed back carried the created id
    let fed_back = h.completion.last_conversation();
    assert!(fed_back.iter().any(|m| matches!(
        m,
        PromptMessage::OperationResult { content, .. } if content.contains("Meeting created")
    )));
}

#[tokio::test]
async fn conflict_defers_to_pending_and_yes_commits_the_alternative() {
    let parser = MappedParser::new().with("tomorrow at 3pm", at(3, 15, 0));
    let calendar = InMemoryCalendar::new().with_meeting(USER, MeetingDraft {
        title: "Planning".to_string(),
        description: None,
        location: None,
        start_time: at(3, 15, 0),
        end_time: at(3, 16, 0),
    });
    let h = harness(
        ScriptedCompletion::new(vec![
            CompletionOutcome::Operations(vec![op(
                "create_meeting",
                json!({ "title": "Standup", "start_time": "tomorrow at 3pm" }),
            )]),
            CompletionOutcome::Direct(
                "That slot is taken. Would 9:00 AM work instead?".to_string(),
            ),
            CompletionOutcome::Direct(String::new()),
        ]),
        calendar,
        parser,
        at(2, 10, 0),
    );

    let first = h
        .service
        .chat(USER, "Schedule a meeting tomorrow at 3pm titled Standup")
        .await
        .unwrap();
    assert!(first.contains("9:00 AM"));
    assert_eq!(h.calendar.meetings().len(), 1, "nothing committed on conflict");

    let pending = h.state.pending(USER, ItemKind::Meeting).expect("pending action stored");
    assert_eq!(pending.title, "Standup");
    assert_eq!(pending.proposed_start, at(3, 9, 0), "held slot is the first alternative");

    let second = h.service.chat(USER, "yes").await.unwrap();
    assert!(second.contains("Scheduled \"Standup\""));
    let meetings = h.calendar.meetings();
    assert_eq!(meetings.len(), 2);
    let standup = meetings.iter().find(|m| m.title == "Standup").unwrap();
    assert_eq!(standup.start_time, at(3, 9, 0));
    assert_eq!(standup.end_time, at(3, 10, 0));
    assert!(h.state.pending(USER, ItemKind::Meeting).is_none(), "pending consumed");
}

#[tokio::test]
async fn yes_without_pending_action_is_a_plain_acknowledgement() {
    let h = harness(
        ScriptedCompletion::new(vec![CompletionOutcome::Direct(String::new())]),
        InMemoryCalendar::new(),
        MappedParser::new(),
        at(2, 10, 0),
    );

    let reply = h.service.chat(USER, "yes").await.unwrap();

    assert!(reply.contains("nothing waiting for confirmation"));
    assert_eq!(h.completion.calls(), 1);
    assert!(h.calendar.meetings().is_empty());
}

#[tokio::test]
async fn confirming_a_pending_task_books_it_and_clears_the_slot() {
    let h = harness(
        ScriptedCompletion::new(vec![CompletionOutcome::Direct(String::new())]),
        InMemoryCalendar::new(),
        MappedParser::new(),
        at(2, 10, 0),
    );
    h.state.seed_pending(
        USER,
        PendingAction {
            kind: ItemKind::Task,
            title: "Write report".to_string(),
            description: None,
            location: None,
            priority: None,
            proposed_start: at(3, 9, 0),
            proposed_end: at(3, 10, 0),
        },
    );

    let reply = h.service.chat(USER, "yes").await.unwrap();

    assert!(reply.contains("Scheduled \"Write report\""));
    let tasks = h.calendar.tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].start_time, Some(at(3, 9, 0)));
    assert!(h.state.pending(USER, ItemKind::Task).is_none(), "pending consumed");
}

#[tokio::test]
async fn past_start_time_is_never_booked_and_suggests_next_day() {
    // 20:00 reference: "yesterday at 3pm" stays in the past even after the
    // resolver's single-day advance, so the service must defer.
    let parser = MappedParser::new().with("yesterday at 3pm", at(1, 15, 0));
    let h = harness(
        ScriptedCompletion::new(vec![
            CompletionOutcome::Operations(vec![op(
                "create_meeting",
                json!({ "title": "Review", "start_time": "yesterday at 3pm" }),
            )]),
            CompletionOutcome::Direct(
                "That time has already passed. Should I book tomorrow at 3 PM?".to_string(),
            ),
        ]),
        InMemoryCalendar::new(),
        parser,
        at(2, 20, 0),
    );

    let reply = h
        .service
        .chat(USER, "Schedule a meeting titled Review for yesterday at 3pm")
        .await
        .unwrap();

    assert!(reply.contains("already passed"));
    assert!(h.calendar.meetings().is_empty(), "past requests are never auto-booked");
    let pending = h.state.pending(USER, ItemKind::Meeting).expect("suggestion held as pending");
    assert_eq!(pending.proposed_start, at(3, 15, 0));
    assert_eq!(pending.proposed_end, at(3, 16, 0));
}

#[tokio::test]
async fn unknown_operation_yields_error_result_and_loop_continues() {
    let h = harness(
        ScriptedCompletion::new(vec![
            CompletionOutcome::Operations(vec![op("send_email", json!({ "to": "sam" }))]),
            CompletionOutcome::Direct(
                "I can't send email, but I can manage your schedule.".to_string(),
            ),
        ]),
        InMemoryCalendar::new(),
        MappedParser::new(),
        at(2, 10, 0),
    );

    let reply = h.service.chat(USER, "Add an email meeting to my calendar").await.unwrap();

    assert!(reply.contains("can't send email"));
    assert_eq!(h.completion.calls(), 2);
    let fed_back = h.completion.last_conversation();
    assert!(fed_back.iter().any(|m| matches!(
        m,
        PromptMessage::OperationResult { content, .. }
            if content.contains("Unknown operation: send_email")
    )));
}

#[tokio::test]
async fn endless_operation_requests_fail_after_the_round_cap() {
    let h = harness(
        ScriptedCompletion::looping(CompletionOutcome::Operations(vec![op(
            "list_meetings",
            json!({}),
        )])),
        InMemoryCalendar::new(),
        MappedParser::new(),
        at(2, 10, 0),
    );

    let err = h.service.chat(USER, "What meetings do I have?").await.unwrap_err();

    assert!(matches!(err, TimewiseError::Completion(_)));
    assert_eq!(h.completion.calls(), MAX_DISPATCH_ROUNDS);
}

#[tokio::test]
async fn newer_reference_replaces_the_stored_context_record() {
    let h = harness(
        ScriptedCompletion::new(vec![
            CompletionOutcome::Direct("Noted.".to_string()),
            CompletionOutcome::Direct("Got it.".to_string()),
        ]),
        InMemoryCalendar::new(),
        MappedParser::new(),
        at(2, 10, 0),
    );

    h.service
        .chat(USER, "Schedule a meeting titled Standup.")
        .await
        .unwrap();
    assert_eq!(
        h.state.context(USER, ItemKind::Meeting).and_then(|c| c.title),
        Some("Standup".to_string())
    );

    h.service
        .chat(USER, "Change it to a meeting titled Retro.")
        .await
        .unwrap();
    assert_eq!(
        h.state.context(USER, ItemKind::Meeting).and_then(|c| c.title),
        Some("Retro".to_string()),
        "one live record per (user, kind); newer reference wins"
    );
}

#[tokio::test]
async fn storage_failure_is_a_visible_result_not_a_turn_failure() {
    let parser = MappedParser::new().with("tomorrow at 3pm", at(3, 15, 0));
    let h = harness(
        ScriptedCompletion::new(vec![
            CompletionOutcome::Operations(vec![op(
                "create_meeting",
                json!({ "title": "Standup", "start_time": "tomorrow at 3pm" }),
            )]),
            CompletionOutcome::Direct("I hit a storage problem saving that.".to_string()),
        ]),
        InMemoryCalendar::new().failing_writes(),
        parser,
        at(2, 10, 0),
    );

    let reply = h
        .service
        .chat(USER, "Schedule a meeting tomorrow at 3pm titled Standup")
        .await
        .unwrap();

    assert_eq!(reply, "I hit a storage problem saving that.");
    let fed_back = h.completion.last_conversation();
    assert!(fed_back.iter().any(|m| matches!(
        m,
        PromptMessage::OperationResult { content, .. }
            if content.contains("simulated write failure")
    )));
}

#[tokio::test]
async fn free_time_query_reports_open_slots_around_busy_blocks() {
    let parser = MappedParser::new().with("tomorrow", at(3, 0, 0));
    let calendar = InMemoryCalendar::new().with_meeting(USER, MeetingDraft {
        title: "Planning".to_string(),
        description: None,
        location: None,
        start_time: at(3, 10, 0),
        end_time: at(3, 11, 0),
    });
    let h = harness(
        ScriptedCompletion::new(vec![
            CompletionOutcome::Operations(vec![op(
                "get_free_time",
                json!({ "date": "tomorrow", "duration_minutes": 60 }),
            )]),
            CompletionOutcome::Direct("You're free from 9 to 10, then after 11.".to_string()),
        ]),
        calendar,
        parser,
        at(2, 10, 0),
    );

    let reply = h.service.chat(USER, "What free time do I have tomorrow?").await.unwrap();

    assert!(reply.contains("free"));
    let fed_back = h.completion.last_conversation();
    let result = fed_back
        .iter()
        .find_map(|m| match m {
            PromptMessage::OperationResult { content, .. } => Some(content.clone()),
            _ => None,
        })
        .expect("free-time result fed back");
    assert!(result.contains("free_slots"));
    assert!(result.contains("2026-03-03T09:00:00"));
    assert!(!result.contains("2026-03-03T10:30:00"), "occupied half-hour never offered");
}
