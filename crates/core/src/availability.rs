//! Availability engine: overlap checks and free-slot search.
//!
//! All functions are pure. Busy intervals come from the caller, which is
//! responsible for loading a user's meetings and timed tasks; untimed tasks
//! never occupy calendar time.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use timewise_domain::constants::{
    BUSINESS_DAY_END_HOUR, BUSINESS_DAY_START_HOUR, SLOT_SEARCH_HORIZON_DAYS, SLOT_STEP_MINUTES,
};
use timewise_domain::{CalendarItem, Interval};

/// Collect busy intervals from calendar items, optionally excluding one item
/// (used when rescheduling so an item does not conflict with itself).
pub fn busy_intervals(items: &[CalendarItem], exclude_id: Option<i64>) -> Vec<Interval> {
    items
        .iter()
        .filter(|item| exclude_id != Some(item.id()))
        .filter_map(CalendarItem::interval)
        .collect()
}

/// True iff `candidate` overlaps none of the busy intervals.
pub fn is_available(busy: &[Interval], candidate: &Interval) -> bool {
    !busy.iter().any(|b| b.overlaps(candidate))
}

/// Start of the business-hours window on `day`.
pub fn business_day_start(day: NaiveDate) -> DateTime<Utc> {
    day_at_hour(day, BUSINESS_DAY_START_HOUR)
}

/// End of the business-hours window on `day`.
pub fn business_day_end(day: NaiveDate) -> DateTime<Utc> {
    day_at_hour(day, BUSINESS_DAY_END_HOUR)
}

fn day_at_hour(day: NaiveDate, hour: u32) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN);
    day.and_time(time).and_utc()
}

/// Open slots of `duration_minutes` on `day` within business hours.
///
/// Slides a window across 09:00-17:00 in 30-minute steps, keeping candidates
/// whose end does not run past the window end and that overlap nothing in
/// `busy`. Result is ordered by start time; an empty result is a fully booked
/// day.
pub fn free_slots(busy: &[Interval], day: NaiveDate, duration_minutes: i64) -> Vec<Interval> {
    let day_start = business_day_start(day);
    let day_end = business_day_end(day);
    let duration = Duration::minutes(duration_minutes.max(0));
    let step = Duration::minutes(SLOT_STEP_MINUTES);

    let mut slots = Vec::new();
    let mut cursor = day_start;
    while cursor + duration <= day_end {
        let candidate = Interval::new(cursor, cursor + duration);
        if is_available(busy, &candidate) {
            slots.push(candidate);
        }
        cursor += step;
    }
    slots
}

/// First open slot of `duration_minutes` at or after `after`, scanning day by
/// day over a bounded horizon.
///
/// The horizon covers `after`'s day plus the six following days; the search
/// never runs further. Returns `None` when every day in the horizon is
/// booked.
pub fn next_available_slot(
    busy: &[Interval],
    duration_minutes: i64,
    after: DateTime<Utc>,
) -> Option<Interval> {
    let first_day = after.date_naive();
    for offset in 0..SLOT_SEARCH_HORIZON_DAYS {
        let day = first_day + Duration::days(offset);
        for slot in free_slots(busy, day, duration_minutes) {
            if slot.start >= after {
                return Some(slot);
            }
        }
    }
    None
}
