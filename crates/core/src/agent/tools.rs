//! Tool catalog exposed to the completion service.
//!
//! Time arguments are free text; the orchestrator resolves them against
//! "now" before execution, so the completion service never has to produce
//! ISO timestamps.

use serde_json::json;

use super::ports::ToolSpec;

/// System prompt for every completion round.
pub const SYSTEM_PROMPT: &str = "You are a smart assistant that helps users manage their \
     calendar, tasks, and meetings. Use the provided tools to create, update, delete and query \
     meetings and tasks, and to find free time slots. Pass time expressions through as the user \
     said them; they are resolved server-side. When a tool reports a conflict or a past time, \
     relay the suggested alternatives to the user and ask for confirmation instead of retrying.";

/// Build the full tool catalog.
pub fn catalog() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: "create_meeting",
            description: "Schedule a meeting for the user",
            parameters: json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string" },
                    "start_time": { "type": "string" },
                    "end_time": { "type": "string" },
                    "location": { "type": "string" },
                    "description": { "type": "string" }
                },
                "required": ["title", "start_time", "end_time"]
            }),
        },
        ToolSpec {
            name: "update_meeting",
            description: "Update an existing meeting; unspecified fields are kept",
            parameters: json!({
                "type": "object",
                "properties": {
                    "meeting_id": { "type": "integer" },
                    "title": { "type": "string" },
                    "start_time": { "type": "string" },
                    "end_time": { "type": "string" },
                    "location": { "type": "string" },
                    "description": { "type": "string" }
                }
            }),
        },
        ToolSpec {
            name: "delete_meeting",
            description: "Delete a meeting identified by id or title",
            parameters: json!({
                "type": "object",
                "properties": {
                    "meeting_id": { "type": "integer" },
                    "title": { "type": "string" },
                    "date": { "type": "string" }
                }
            }),
        },
        ToolSpec {
            name: "list_meetings",
            description: "List the user's meetings, optionally for one date",
            parameters: json!({
                "type": "object",
                "properties": {
                    "date": { "type": "string" }
                }
            }),
        },
        ToolSpec {
            name: "create_task",
            description: "Create a task, optionally pinned to a time window",
            parameters: json!({
                "type": "object",
                "properties": {
                    "title": { "type": "string" },
                    "description": { "type": "string" },
                    "priority": { "type": "string", "enum": ["low", "medium", "high"] },
                    "start_time": { "type": "string" },
                    "end_time": { "type": "string" }
                },
                "required": ["title"]
            }),
        },
        ToolSpec {
            name: "update_task",
            description: "Update an existing task; unspecified fields are kept",
            parameters: json!({
                "type": "object",
                "properties": {
                    "task_id": { "type": "integer" },
                    "title": { "type": "string" },
                    "description": { "type": "string" },
                    "priority": { "type": "string", "enum": ["low", "medium", "high"] },
                    "status": { "type": "string", "enum": ["pending", "in_progress", "completed"] },
                    "start_time": { "type": "string" },
                    "end_time": { "type": "string" }
                }
            }),
        },
        ToolSpec {
            name: "delete_task",
            description: "Delete a task identified by id, title or time",
            parameters: json!({
                "type": "object",
                "properties": {
                    "task_id": { "type": "integer" },
                    "title": { "type": "string" },
                    "date": { "type": "string" },
                    "start_time": { "type": "string" },
                    "end_time": { "type": "string" }
                }
            }),
        },
        ToolSpec {
            name: "list_tasks",
            description: "List the user's tasks, optionally for one date",
            parameters: json!({
                "type": "object",
                "properties": {
                    "date": { "type": "string" }
                }
            }),
        },
        ToolSpec {
            name: "get_free_time",
            description: "Get available time slots for the user",
            parameters: json!({
                "type": "object",
                "properties": {
                    "date": { "type": "string" },
                    "duration_minutes": { "type": "integer" }
                },
                "required": ["date", "duration_minutes"]
            }),
        },
        ToolSpec {
            name: "get_free_time_for_task",
            description: "Get available time slots suitable for scheduling a task",
            parameters: json!({
                "type": "object",
                "properties": {
                    "date": { "type": "string" },
                    "duration_minutes": { "type": "integer" }
                },
                "required": ["date", "duration_minutes"]
            }),
        },
    ]
}
