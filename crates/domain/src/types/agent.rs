//! Agent conversational state: context records and pending actions.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::calendar::TaskPriority;

/// The two concrete calendar item kinds the agent tracks state for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Meeting,
    Task,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Meeting => "meeting",
            Self::Task => "task",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "meeting" => Some(Self::Meeting),
            "task" => Some(Self::Task),
            _ => None,
        }
    }
}

/// Outcome of classifying a message. Ambiguous messages update context for
/// both kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindGuess {
    Meeting,
    Task,
    Ambiguous,
}

/// The most recently referenced title/date for one (user, kind). At most one
/// live record per pair; setting replaces the previous record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextRecord {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
}

impl ContextRecord {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.date.is_none()
    }
}

/// A drafted-but-unconfirmed calendar item awaiting user confirmation.
///
/// At most one live pending action per (user, kind); a new draft of the same
/// kind replaces and discards the previous one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingAction {
    pub kind: ItemKind,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub priority: Option<TaskPriority>,
    pub proposed_start: DateTime<Utc>,
    pub proposed_end: DateTime<Utc>,
}
