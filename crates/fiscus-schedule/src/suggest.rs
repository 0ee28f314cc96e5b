//! Smart scheduling suggestions.
//!
//! Projects high-confidence recurring patterns forward and proposes
//! free slots in the user's preferred hours.

use chrono::{DateTime, Duration, Months, Timelike, Utc};
use fiscus_core::types::Event;
use serde::Serialize;
use std::collections::HashMap;

use crate::patterns::{detect_recurring_patterns, PatternKind, RecurringPattern};

/// Patterns below this confidence are not projected forward.
const PROJECTION_CONFIDENCE: f64 = 0.8;
/// Two events within this many minutes of each other are a conflict.
const CONFLICT_WINDOW_MINS: i64 = 60;
/// Hours proposed for free slots, in preference order.
const PREFERRED_HOURS: [u32; 4] = [9, 10, 14, 15];
/// An hour with more than this many historical events is avoided.
const BUSY_THRESHOLD: usize = 5;
/// At most this many free-slot candidates are considered.
const MAX_SLOTS: usize = 5;
/// Of those, this many are suggested.
const SUGGESTED_SLOTS: usize = 2;

/// One proposed event time.
#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub title: String,
    pub suggested_time: DateTime<Utc>,
    pub reason: String,
    pub confidence: f64,
    /// Upcoming events within an hour of the suggestion.
    pub conflicts_with: Vec<String>,
}

/// Project a pattern one step past its last occurrence.
pub fn next_occurrence(pattern: &RecurringPattern, last: DateTime<Utc>) -> DateTime<Utc> {
    match pattern.kind {
        PatternKind::Daily => last + Duration::days(pattern.interval as i64),
        PatternKind::Weekly => last + Duration::days(7 * pattern.interval as i64),
        PatternKind::Biweekly => last + Duration::days(14),
        // Calendar month, not 30 days: "rent on the 1st" stays on the 1st.
        PatternKind::Monthly => last
            .checked_add_months(Months::new(pattern.interval))
            .unwrap_or(last + Duration::days(30)),
        PatternKind::Custom => last + Duration::days(7),
    }
}

/// Count historical events per hour of day.
fn busy_hours(events: &[Event]) -> HashMap<u32, usize> {
    let mut counts = HashMap::new();
    for event in events {
        *counts.entry(event.date_time.hour()).or_insert(0) += 1;
    }
    counts
}

fn conflicts<'a>(upcoming: &'a [&Event], time: DateTime<Utc>) -> Vec<&'a Event> {
    upcoming
        .iter()
        .filter(|e| (e.date_time - time).abs() < Duration::minutes(CONFLICT_WINDOW_MINS))
        .copied()
        .collect()
}

/// Propose event times based on past behavior.
///
/// High-confidence recurring patterns are projected one step forward;
/// then up to two free slots in preferred hours over the next week are
/// added. Output is sorted by confidence, highest first.
pub fn smart_suggestions(events: &[Event], now: DateTime<Utc>) -> Vec<Suggestion> {
    let upcoming: Vec<&Event> = events.iter().filter(|e| e.date_time > now).collect();
    let past: Vec<Event> = events
        .iter()
        .filter(|e| e.date_time <= now)
        .cloned()
        .collect();

    let mut suggestions = Vec::new();

    for pattern in detect_recurring_patterns(&past) {
        if pattern.confidence <= PROJECTION_CONFIDENCE {
            continue;
        }
        let last = match pattern.occurrences.last() {
            Some(last) => *last,
            None => continue,
        };
        let suggested_time = next_occurrence(&pattern, last);
        let conflicting = conflicts(&upcoming, suggested_time);

        suggestions.push(Suggestion {
            title: pattern.title.clone(),
            suggested_time,
            reason: format!("Based on {} pattern detected", pattern.kind.name()),
            confidence: pattern.confidence,
            conflicts_with: conflicting.iter().map(|e| e.title.clone()).collect(),
        });
    }

    let histogram = busy_hours(events);
    let mut slots = Vec::new();
    'days: for day in 1..=7 {
        for hour in PREFERRED_HOURS {
            let slot = (now + Duration::days(day))
                .with_hour(hour)
                .and_then(|t| t.with_minute(0))
                .and_then(|t| t.with_second(0))
                .and_then(|t| t.with_nanosecond(0));
            let Some(slot) = slot else { continue };

            let busy = histogram.get(&hour).copied().unwrap_or(0) > BUSY_THRESHOLD;
            if busy || !conflicts(&upcoming, slot).is_empty() {
                continue;
            }
            slots.push(slot);
            if slots.len() >= MAX_SLOTS {
                break 'days;
            }
        }
    }

    for slot in slots.into_iter().take(SUGGESTED_SLOTS) {
        suggestions.push(Suggestion {
            title: "Available Time Slot".to_string(),
            suggested_time: slot,
            reason: "Optimal time based on your schedule".to_string(),
            confidence: 0.7,
            conflicts_with: Vec::new(),
        });
    }

    suggestions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap()
    }

    fn weekly_series(title: &str, count: usize) -> Vec<Event> {
        (0..count)
            .map(|i| Event::new(title, base() + Duration::days(7 * i as i64)))
            .collect()
    }

    fn pattern_of(kind: PatternKind, interval: u32) -> RecurringPattern {
        RecurringPattern {
            kind,
            interval,
            confidence: 1.0,
            title: "x".into(),
            occurrences: vec![base()],
        }
    }

    #[test]
    fn test_next_occurrence_cadences() {
        let last = base();
        assert_eq!(
            next_occurrence(&pattern_of(PatternKind::Daily, 1), last),
            last + Duration::days(1)
        );
        assert_eq!(
            next_occurrence(&pattern_of(PatternKind::Weekly, 1), last),
            last + Duration::days(7)
        );
        assert_eq!(
            next_occurrence(&pattern_of(PatternKind::Biweekly, 2), last),
            last + Duration::days(14)
        );
        assert_eq!(
            next_occurrence(&pattern_of(PatternKind::Custom, 1), last),
            last + Duration::days(7)
        );
    }

    #[test]
    fn test_monthly_next_occurrence_keeps_day_of_month() {
        // Jan 5 -> Feb 5, despite February being short of 30 days later.
        let last = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
        let next = next_occurrence(&pattern_of(PatternKind::Monthly, 1), last);
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 2, 5, 9, 0, 0).unwrap());
    }

    #[test]
    fn test_pattern_projected_forward() {
        let events = weekly_series("Team Standup", 4);
        let now = base() + Duration::days(22);
        let suggestions = smart_suggestions(&events, now);

        let projected = suggestions
            .iter()
            .find(|s| s.title == "Team Standup")
            .expect("weekly pattern should be projected");
        assert_eq!(projected.suggested_time, base() + Duration::days(28));
        assert!(projected.conflicts_with.is_empty());
        assert!((projected.confidence - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_projection_flags_conflicts() {
        let mut events = weekly_series("Team Standup", 4);
        let now = base() + Duration::days(22);
        // An upcoming event 30 minutes from the projected slot.
        events.push(Event::new(
            "Budget Review",
            base() + Duration::days(28) + Duration::minutes(30),
        ));
        let suggestions = smart_suggestions(&events, now);
        let projected = suggestions
            .iter()
            .find(|s| s.title == "Team Standup")
            .unwrap();
        assert_eq!(projected.conflicts_with, vec!["Budget Review".to_string()]);
    }

    #[test]
    fn test_free_slots_use_preferred_hours() {
        let suggestions = smart_suggestions(&[], base());
        let slots: Vec<&Suggestion> = suggestions
            .iter()
            .filter(|s| s.title == "Available Time Slot")
            .collect();
        assert_eq!(slots.len(), 2);
        for slot in slots {
            assert!(PREFERRED_HOURS.contains(&slot.suggested_time.hour()));
            assert!(slot.suggested_time > base());
            assert_eq!(slot.suggested_time.minute(), 0);
        }
    }

    #[test]
    fn test_sorted_by_confidence() {
        let events = weekly_series("Team Standup", 4);
        let suggestions = smart_suggestions(&events, base() + Duration::days(22));
        for pair in suggestions.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }
}
