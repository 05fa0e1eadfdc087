//! Time resolution: free-text time expressions to concrete instants.
//!
//! Raw parsing is delegated to a [`DateExpressionParser`] collaborator; this
//! module owns the "never schedule in the past" correction rules applied on
//! top of whatever the parser produced.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Bare clock time: `H`, `H:MM`, `Ham`, `H:MM pm` and similar, nothing
    /// else in the expression.
    static ref BARE_CLOCK_RE: Regex =
        Regex::new(r"(?i)^\s*\d{1,2}(?:[:.]\d{2})?\s*(?:am|pm)?\s*$").unwrap();
}

/// Natural-language date/time parser collaborator.
///
/// Pure: given the same text and reference instant it returns the same
/// result, and it may simply fail to parse.
pub trait DateExpressionParser: Send + Sync {
    /// Parse `text` relative to `reference`; `None` when the text carries no
    /// recognizable date or time expression.
    fn parse(&self, text: &str, reference: DateTime<Utc>) -> Option<DateTime<Utc>>;
}

/// Resolves free-text time expressions against a reference instant.
#[derive(Clone)]
pub struct TimeResolver {
    parser: Arc<dyn DateExpressionParser>,
}

impl TimeResolver {
    pub fn new(parser: Arc<dyn DateExpressionParser>) -> Self {
        Self { parser }
    }

    /// Resolve `expression` to an instant, applying correction rules in
    /// order:
    ///
    /// 1. The expression literally says "tomorrow": force the date to
    ///    `reference + 1 day`, keep the parsed time-of-day.
    /// 2. The expression is a bare clock time: pin it to `reference`'s date,
    ///    rolling to the next day when that instant already passed.
    /// 3. Anything else that still resolved into the past is advanced by
    ///    exactly one day, never further.
    ///
    /// Returns `None` when the collaborator cannot parse the expression;
    /// callers treat the field as missing.
    pub fn resolve(
        &self,
        expression: &str,
        reference: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let parsed = self.parser.parse(expression, reference)?;

        if expression.to_lowercase().contains("tomorrow") {
            let tomorrow = reference.date_naive() + Duration::days(1);
            return Some(tomorrow.and_time(parsed.time()).and_utc());
        }

        if BARE_CLOCK_RE.is_match(expression) {
            let pinned = reference.date_naive().and_time(parsed.time()).and_utc();
            return Some(if pinned < reference { pinned + Duration::days(1) } else { pinned });
        }

        if parsed < reference {
            return Some(parsed + Duration::days(1));
        }

        Some(parsed)
    }
}
