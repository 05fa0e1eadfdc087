//! Regex-based date/time expression parser.
//!
//! Finds date and time expressions embedded anywhere in free text, so it
//! works both on isolated tool arguments ("tomorrow at 3pm") and on whole
//! user messages. Correction of ambiguous results (past instants, bare
//! clock times) is the resolver's job, not the parser's; this type only
//! reports the most literal reading it can find.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use lazy_static::lazy_static;
use regex::Regex;
use timewise_core::DateExpressionParser;

lazy_static! {
    static ref RELATIVE_RE: Regex =
        Regex::new(r"(?i)\bin\s+(\d+)\s+(minutes?|hours?|days?)\b").unwrap();
    static ref ISO_DATE_RE: Regex = Regex::new(r"\b(\d{4})-(\d{2})-(\d{2})\b").unwrap();
    static ref DAY_WORD_RE: Regex =
        Regex::new(r"(?i)\b(today|tonight|tomorrow)\b").unwrap();
    static ref WEEKDAY_RE: Regex = Regex::new(
        r"(?i)\b(next\s+)?(monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b"
    )
    .unwrap();
    static ref CLOCK_RE: Regex =
        Regex::new(r"(?i)\b(\d{1,2})(?:[:.](\d{2}))?\s*(am|pm)\b").unwrap();
    static ref CLOCK_24H_RE: Regex = Regex::new(r"\b(\d{1,2}):(\d{2})\b").unwrap();
    static ref NOON_RE: Regex = Regex::new(r"(?i)\b(noon|midday|midnight)\b").unwrap();
}

/// Hour a date-only expression resolves to.
const DEFAULT_HOUR: u32 = 9;

#[derive(Debug, Default, Clone, Copy)]
pub struct NaturalDateParser;

impl NaturalDateParser {
    pub fn new() -> Self {
        Self
    }
}

impl DateExpressionParser for NaturalDateParser {
    fn parse(&self, text: &str, reference: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if let Some(instant) = parse_relative(text, reference) {
            return Some(instant);
        }

        let date = find_date(text, reference);
        let time = find_time(text);

        match (date, time) {
            (Some(date), Some(time)) => Some(date.and_time(time).and_utc()),
            (Some(date), None) => {
                let time = NaiveTime::from_hms_opt(DEFAULT_HOUR, 0, 0)?;
                Some(date.and_time(time).and_utc())
            }
            (None, Some(time)) => Some(reference.date_naive().and_time(time).and_utc()),
            (None, None) => None,
        }
    }
}

fn parse_relative(text: &str, reference: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let caps = RELATIVE_RE.captures(text)?;
    let amount: i64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2)?.as_str().to_lowercase();
    let delta = if unit.starts_with("minute") {
        Duration::minutes(amount)
    } else if unit.starts_with("hour") {
        Duration::hours(amount)
    } else {
        Duration::days(amount)
    };
    Some(reference + delta)
}

fn find_date(text: &str, reference: DateTime<Utc>) -> Option<NaiveDate> {
    if let Some(caps) = ISO_DATE_RE.captures(text) {
        let year: i32 = caps.get(1)?.as_str().parse().ok()?;
        let month: u32 = caps.get(2)?.as_str().parse().ok()?;
        let day: u32 = caps.get(3)?.as_str().parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    let today = reference.date_naive();
    if let Some(caps) = DAY_WORD_RE.captures(text) {
        return match caps.get(1)?.as_str().to_lowercase().as_str() {
            "tomorrow" => Some(today + Duration::days(1)),
            _ => Some(today),
        };
    }

    if let Some(caps) = WEEKDAY_RE.captures(text) {
        let explicit_next = caps.get(1).is_some();
        let target = weekday_from_name(caps.get(2)?.as_str())?;
        let ahead =
            i64::from(target.num_days_from_monday()) - i64::from(today.weekday().num_days_from_monday());
        let mut days = ahead.rem_euclid(7);
        // "friday" on a Friday means today; "next friday" never does.
        if explicit_next && days == 0 {
            days = 7;
        }
        return Some(today + Duration::days(days));
    }

    None
}

fn find_time(text: &str) -> Option<NaiveTime> {
    if let Some(caps) = CLOCK_RE.captures(text) {
        let mut hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u32 = caps.get(2).map_or(Some(0), |m| m.as_str().parse().ok())?;
        let meridiem = caps.get(3)?.as_str().to_lowercase();
        if hour > 12 || minute > 59 {
            return None;
        }
        if meridiem == "pm" && hour != 12 {
            hour += 12;
        } else if meridiem == "am" && hour == 12 {
            hour = 0;
        }
        return NaiveTime::from_hms_opt(hour, minute, 0);
    }

    if let Some(caps) = NOON_RE.captures(text) {
        let hour = match caps.get(1)?.as_str().to_lowercase().as_str() {
            "midnight" => 0,
            _ => 12,
        };
        return NaiveTime::from_hms_opt(hour, 0, 0);
    }

    if let Some(caps) = CLOCK_24H_RE.captures(text) {
        let hour: u32 = caps.get(1)?.as_str().parse().ok()?;
        let minute: u32 = caps.get(2)?.as_str().parse().ok()?;
        if hour > 23 || minute > 59 {
            return None;
        }
        return NaiveTime::from_hms_opt(hour, minute, 0);
    }

    None
}

fn weekday_from_name(name: &str) -> Option<Weekday> {
    match name.to_lowercase().as_str() {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}
