//! Recurring-event pattern detection.
//!
//! Groups events by normalized title, measures interval consistency,
//! and classifies accepted groups into daily/weekly/biweekly/monthly
//! cadences.

use chrono::{DateTime, Utc};
use fiscus_core::types::Event;
use serde::Serialize;
use std::collections::BTreeMap;

const DAY_SECS: i64 = 24 * 60 * 60;
const WEEK_SECS: i64 = 7 * DAY_SECS;
const MONTH_SECS: i64 = 30 * DAY_SECS;

/// Minimum occurrences before a group is considered.
const MIN_OCCURRENCES: usize = 3;
/// Consistency threshold for accepting a group as a pattern.
const MIN_CONSISTENCY: f64 = 0.7;

/// Cadence of a recurring pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Custom,
}

impl PatternKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Biweekly => "biweekly",
            Self::Monthly => "monthly",
            Self::Custom => "custom",
        }
    }
}

/// A detected recurring pattern.
#[derive(Debug, Clone, Serialize)]
pub struct RecurringPattern {
    pub kind: PatternKind,
    /// Multiplier on the base cadence (2 for biweekly, otherwise 1).
    pub interval: u32,
    /// Interval consistency in [0, 1].
    pub confidence: f64,
    pub title: String,
    /// Occurrence times, oldest first.
    pub occurrences: Vec<DateTime<Utc>>,
}

/// Classify a mean interval (seconds) into a cadence.
fn classify(mean_secs: f64) -> (PatternKind, u32) {
    let day = DAY_SECS as f64;
    let week = WEEK_SECS as f64;
    let month = MONTH_SECS as f64;

    if (mean_secs - day).abs() < day * 0.1 {
        (PatternKind::Daily, 1)
    } else if (mean_secs - week).abs() < day * 0.5 {
        (PatternKind::Weekly, 1)
    } else if (mean_secs - 2.0 * week).abs() < day * 0.5 {
        (PatternKind::Biweekly, 2)
    } else if (mean_secs - month).abs() < day * 2.0 {
        (PatternKind::Monthly, 1)
    } else {
        (PatternKind::Custom, 1)
    }
}

/// Detect recurring patterns in a set of events.
///
/// Groups with fewer than three occurrences or a zero mean interval
/// (all occurrences at the same instant) are skipped. Output is sorted
/// by confidence, highest first.
pub fn detect_recurring_patterns(events: &[Event]) -> Vec<RecurringPattern> {
    let mut sorted: Vec<&Event> = events.iter().collect();
    sorted.sort_by_key(|e| e.date_time);

    // BTreeMap keeps group iteration deterministic.
    let mut groups: BTreeMap<String, Vec<&Event>> = BTreeMap::new();
    for event in sorted {
        groups
            .entry(event.title.to_lowercase().trim().to_string())
            .or_default()
            .push(event);
    }

    let mut patterns = Vec::new();

    for group in groups.values() {
        if group.len() < MIN_OCCURRENCES {
            continue;
        }

        let intervals: Vec<f64> = group
            .windows(2)
            .map(|pair| (pair[1].date_time - pair[0].date_time).num_seconds() as f64)
            .collect();

        let mean = intervals.iter().sum::<f64>() / intervals.len() as f64;
        if mean <= 0.0 {
            // Degenerate group: duplicate timestamps carry no cadence.
            continue;
        }

        let variance = intervals
            .iter()
            .map(|i| (i - mean).powi(2))
            .sum::<f64>()
            / intervals.len() as f64;
        let stddev = variance.sqrt();

        let consistency = 1.0 - (stddev / mean).min(1.0);
        if consistency <= MIN_CONSISTENCY {
            continue;
        }

        let (kind, interval) = classify(mean);
        patterns.push(RecurringPattern {
            kind,
            interval,
            confidence: consistency,
            title: group[0].title.clone(),
            occurrences: group.iter().map(|e| e.date_time).collect(),
        });
    }

    patterns.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn event_at(title: &str, time: DateTime<Utc>) -> Event {
        Event::new(title, time)
    }

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap()
    }

    fn series(title: &str, step: Duration, count: usize) -> Vec<Event> {
        (0..count)
            .map(|i| event_at(title, base() + step * i as i32))
            .collect()
    }

    #[test]
    fn test_exact_weekly_series_full_confidence() {
        let events = series("Team Standup", Duration::days(7), 4);
        let patterns = detect_recurring_patterns(&events);
        assert_eq!(patterns.len(), 1);
        let p = &patterns[0];
        assert_eq!(p.kind, PatternKind::Weekly);
        assert_eq!(p.interval, 1);
        assert!((p.confidence - 1.0).abs() < 1e-9);
        assert_eq!(p.title, "Team Standup");
        assert_eq!(p.occurrences.len(), 4);
    }

    #[test]
    fn test_daily_and_biweekly_classification() {
        let mut events = series("Gym", Duration::days(1), 5);
        events.extend(series("Payday", Duration::days(14), 3));
        let patterns = detect_recurring_patterns(&events);
        assert_eq!(patterns.len(), 2);
        let kinds: Vec<PatternKind> = patterns.iter().map(|p| p.kind).collect();
        assert!(kinds.contains(&PatternKind::Daily));
        assert!(kinds.contains(&PatternKind::Biweekly));
    }

    #[test]
    fn test_monthly_tolerance_window() {
        // 31-day spacing still classifies as monthly (30d +/- 2d).
        let events = series("Rent", Duration::days(31), 4);
        let patterns = detect_recurring_patterns(&events);
        assert_eq!(patterns[0].kind, PatternKind::Monthly);
    }

    #[test]
    fn test_odd_interval_is_custom() {
        let events = series("Haircut", Duration::days(4), 4);
        let patterns = detect_recurring_patterns(&events);
        assert_eq!(patterns[0].kind, PatternKind::Custom);
        assert_eq!(patterns[0].interval, 1);
    }

    #[test]
    fn test_small_groups_skipped() {
        let events = series("Dentist", Duration::days(7), 2);
        assert!(detect_recurring_patterns(&events).is_empty());
    }

    #[test]
    fn test_inconsistent_intervals_rejected() {
        let events = vec![
            event_at("Meeting", base()),
            event_at("Meeting", base() + Duration::days(1)),
            event_at("Meeting", base() + Duration::days(30)),
            event_at("Meeting", base() + Duration::days(33)),
        ];
        assert!(detect_recurring_patterns(&events).is_empty());
    }

    #[test]
    fn test_duplicate_timestamps_do_not_panic() {
        // Zero mean interval: the group must be skipped, not divided by.
        let events = vec![
            event_at("Glitch", base()),
            event_at("Glitch", base()),
            event_at("Glitch", base()),
        ];
        assert!(detect_recurring_patterns(&events).is_empty());
    }

    #[test]
    fn test_title_grouping_is_case_insensitive() {
        let events = vec![
            event_at("team standup", base()),
            event_at("Team Standup", base() + Duration::days(7)),
            event_at("TEAM STANDUP ", base() + Duration::days(14)),
        ];
        let patterns = detect_recurring_patterns(&events);
        assert_eq!(patterns.len(), 1);
        assert_eq!(patterns[0].occurrences.len(), 3);
    }

    #[test]
    fn test_sorted_by_confidence_descending() {
        let mut events = series("Exact", Duration::days(7), 4);
        // A slightly jittered weekly series: accepted but lower confidence.
        events.push(event_at("Jittery", base()));
        events.push(event_at("Jittery", base() + Duration::days(7) + Duration::hours(10)));
        events.push(event_at("Jittery", base() + Duration::days(14)));
        events.push(event_at("Jittery", base() + Duration::days(21) + Duration::hours(8)));
        let patterns = detect_recurring_patterns(&events);
        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns[0].title, "Exact");
        assert!(patterns[0].confidence >= patterns[1].confidence);
    }
}
