//! Intent and reference extraction heuristics.
//!
//! A recall-favoring regex gate decides whether a message is about
//! scheduling at all, a keyword classifier guesses meeting vs task, and a
//! small cascade of patterns pulls a referenced title/date out of the
//! message or, for elliptical follow-ups ("move it to 4pm"), out of recent
//! history. Everything here sits behind narrow functions so the heuristics
//! can be swapped without touching the orchestration loop.

use chrono::{DateTime, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use timewise_domain::constants::CONFIRMATION_PHRASES;
use timewise_domain::{ContextRecord, ConversationTurn, KindGuess};

use crate::timeres::TimeResolver;

lazy_static! {
    static ref SCHEDULING_RE: Regex = Regex::new(
        r"(?i)\b(meetings?|tasks?|schedule|appointments?|calendar|events?|deadlines?|remind(?:er)?s?|todos?|availability|available|free\s+time|slots?)\b"
    ).unwrap();
    static ref ACTION_RE: Regex = Regex::new(
        r"(?i)\b(create|add|book|set\s+up|plan|cancel|delete|remove|move|reschedule|update|change|shift|postpone)\b"
    ).unwrap();
    static ref TIME_RE: Regex = Regex::new(
        r"(?i)\b(today|tomorrow|tonight|next|noon|midnight|morning|afternoon|evening|week(?:end)?|monday|tuesday|wednesday|thursday|friday|saturday|sunday|\d{1,2}(?:[:.]\d{2})?\s*(?:am|pm)|\d{1,2}\s*o'?clock|in\s+\d+\s+(?:minutes?|hours?|days?))\b"
    ).unwrap();
    static ref QUESTION_RE: Regex = Regex::new(
        r"(?i)\b(what|when|where|do\s+i|have\s+i|am\s+i|is\s+there|anything|any)\b"
    ).unwrap();
    static ref TASK_KIND_RE: Regex =
        Regex::new(r"(?i)\b(tasks?|todos?|remind(?:er)?s?|deadlines?)\b").unwrap();
    static ref MEETING_KIND_RE: Regex = Regex::new(
        r"(?i)\b(meetings?|appointments?|calls?|events?|sync|standup|catch\s*-?\s*up|1:1)\b"
    ).unwrap();

    /// Leading verbiage stripped before title extraction.
    static ref LEADING_VERBS_RE: Regex = Regex::new(
        r"(?i)^(?:please\s+|can\s+you\s+|could\s+you\s+)?(?:(?:create|add|book|schedule|set\s+up|plan|cancel|delete|remove|move|reschedule|update|change|shift|postpone)\s+)+(?:(?:a|an|the|my|new)\s+)*"
    ).unwrap();
    static ref QUOTED_RE: Regex = Regex::new(r#""([^"]+)"|'([^']+)'"#).unwrap();
    static ref TITLED_RE: Regex =
        Regex::new(r"(?i)\btitled\s+([\w][\w ]*?)(?:\s+(?:for|at|on|from|to)\b|[.,!?]|$)").unwrap();
    static ref CAP_MEETING_RE: Regex =
        Regex::new(r"\b([A-Z][\w]*(?:\s+[A-Z][\w]*)*)\s+Meeting\b").unwrap();
    static ref PHRASE_KIND_RE: Regex = Regex::new(
        r"(?i)\b([\w][\w ]*?)\s+(?:meeting|event|call|appointment)\b"
    ).unwrap();
    static ref CAPITALIZED_RE: Regex =
        Regex::new(r"\b([A-Z][a-z][\w]*(?:\s+[A-Z][\w]*)*)\b").unwrap();

    static ref TRAILING_PUNCT_RE: Regex = Regex::new(r"[\s.!?,;:]+$").unwrap();
}

/// Words never usable as a title on their own (day names, pronouns and
/// similar false positives of the capitalized-word fallback).
const TITLE_STOPWORDS: &[&str] = &[
    "i", "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday", "today",
    "tomorrow", "meeting", "task", "am", "pm", "what", "when", "where", "who", "can", "could",
    "please", "schedule", "add", "move", "cancel", "change",
];

/// Gate: does this message plausibly concern scheduling?
///
/// True when the message carries a scheduling keyword, or pairs an action
/// verb with a time expression, or pairs a question word with a time
/// expression. Deliberately favors recall; irrelevant messages get a fixed
/// capability reply and never reach the completion service.
pub fn is_scheduling_relevant(message: &str) -> bool {
    if SCHEDULING_RE.is_match(message) {
        return true;
    }
    let has_time = TIME_RE.is_match(message);
    has_time && (ACTION_RE.is_match(message) || QUESTION_RE.is_match(message))
}

/// True when the message is one of the fixed confirmation phrases.
pub fn is_confirmation(message: &str) -> bool {
    let normalized = TRAILING_PUNCT_RE.replace(message.trim(), "").to_lowercase();
    CONFIRMATION_PHRASES.contains(&normalized.as_str())
}

/// Guess whether the message concerns a meeting, a task, or either.
pub fn classify_kind(message: &str) -> KindGuess {
    let task = TASK_KIND_RE.is_match(message);
    let meeting = MEETING_KIND_RE.is_match(message);
    match (task, meeting) {
        (true, false) => KindGuess::Task,
        (false, true) => KindGuess::Meeting,
        _ => KindGuess::Ambiguous,
    }
}

/// Extract the title the message refers to, if any.
///
/// Strips leading action verbs, then tries in order: an explicit
/// `titled ...` phrase, a quoted substring, a capitalized `<Phrase> Meeting`
/// pattern, a `<phrase> meeting/event/call/appointment` pattern, and finally
/// a capitalized-word fallback. First match wins.
pub fn extract_referenced_title(message: &str) -> Option<String> {
    let stripped = LEADING_VERBS_RE.replace(message, "");

    if let Some(caps) = TITLED_RE.captures(&stripped) {
        if let Some(title) = clean_title(caps.get(1).map(|m| m.as_str())) {
            return Some(title);
        }
    }

    if let Some(caps) = QUOTED_RE.captures(&stripped) {
        let quoted = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str());
        if let Some(title) = clean_title(quoted) {
            return Some(title);
        }
    }

    if let Some(caps) = CAP_MEETING_RE.captures(&stripped) {
        if let Some(title) = clean_title(caps.get(1).map(|m| m.as_str())) {
            return Some(title);
        }
    }

    if let Some(caps) = PHRASE_KIND_RE.captures(&stripped) {
        if let Some(title) = clean_title(caps.get(1).map(|m| m.as_str())) {
            return Some(title);
        }
    }

    CAPITALIZED_RE
        .captures_iter(&stripped)
        .filter_map(|caps| clean_title(caps.get(1).map(|m| m.as_str())))
        .next()
}

fn clean_title(raw: Option<&str>) -> Option<String> {
    let mut words: Vec<&str> = raw?.split_whitespace().collect();
    while let Some(first) = words.first() {
        if matches!(
            first.to_lowercase().as_str(),
            "a" | "an" | "the" | "my" | "your" | "our" | "this" | "that" | "new"
        ) {
            words.remove(0);
        } else {
            break;
        }
    }
    let candidate = words.join(" ");
    let lower = candidate.to_lowercase();
    if candidate.is_empty() || TITLE_STOPWORDS.contains(&lower.as_str()) {
        None
    } else {
        Some(candidate)
    }
}

/// Extract a referenced date from the message, resolved against `now`.
/// Only the date component is kept.
pub fn extract_referenced_date(
    message: &str,
    resolver: &TimeResolver,
    now: DateTime<Utc>,
) -> Option<NaiveDate> {
    resolver.resolve(message, now).map(|instant| instant.date_naive())
}

/// Fallback for elliptical follow-ups: scan recent turns newest-first for a
/// title and date, stopping as soon as both are found. `turns` must be
/// ordered newest first; partial results are returned when the scan runs
/// out.
pub fn infer_from_history(
    turns: &[ConversationTurn],
    resolver: &TimeResolver,
    now: DateTime<Utc>,
) -> ContextRecord {
    let mut record = ContextRecord::default();
    for turn in turns {
        if record.title.is_none() {
            record.title = extract_referenced_title(&turn.content);
        }
        if record.date.is_none() {
            record.date = extract_referenced_date(&turn.content, resolver, now);
        }
        if record.title.is_some() && record.date.is_some() {
            break;
        }
    }
    record
}
