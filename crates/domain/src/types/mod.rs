//! Domain types and models

pub mod agent;
pub mod calendar;
pub mod chat;

pub use agent::{ContextRecord, ItemKind, KindGuess, PendingAction};
pub use calendar::{
    CalendarItem, Interval, Meeting, MeetingDraft, MeetingPatch, Task, TaskDraft, TaskPatch,
    TaskPriority, TaskStatus,
};
pub use chat::{ConversationTurn, Role};
