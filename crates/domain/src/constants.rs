//! Application constants
//!
//! Centralized location for all domain-level constants used throughout the
//! application.

// Availability search grid
pub const BUSINESS_DAY_START_HOUR: u32 = 9;
pub const BUSINESS_DAY_END_HOUR: u32 = 17;
pub const SLOT_STEP_MINUTES: i64 = 30;

/// Days scanned (inclusive of the starting day) when searching for the next
/// open slot. The search never runs past this horizon.
pub const SLOT_SEARCH_HORIZON_DAYS: i64 = 7;

// Conversation handling
pub const HISTORY_SCAN_TURNS: usize = 10;

/// Upper bound on completion-service rounds within a single turn. A
/// collaborator that keeps requesting operations past this cap is treated as
/// faulty and the turn fails visibly.
pub const MAX_DISPATCH_ROUNDS: usize = 8;

/// Messages matching one of these (case-insensitive, trimmed of punctuation)
/// consume the stored conversational context instead of overwriting it.
pub const CONFIRMATION_PHRASES: &[&str] =
    &["yes", "ok", "okay", "confirm", "do it", "schedule it", "that time"];

/// Fixed reply for messages that carry no scheduling intent.
pub const OUT_OF_SCOPE_REPLY: &str = "I can help you manage your calendar: schedule, move or \
     cancel meetings and tasks, check your availability, and find free time slots. What would \
     you like to do?";
