//! Natural-language event parsing.
//!
//! Turns phrases like "Schedule meeting with John tomorrow at 2pm"
//! into a title plus timestamp. Recognizes a small vocabulary of
//! relative day words, weekday names, and clock times.

use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc, Weekday};
use fiscus_core::types::Event;

/// Default hour when a phrase names a day but no time.
const DEFAULT_HOUR: u32 = 9;

/// A parsed natural-language event phrase.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEvent {
    pub title: String,
    pub date_time: DateTime<Utc>,
}

const PREFIXES: &[&str] = &[
    "schedule",
    "remind me to",
    "remind me about",
    "create event",
    "add event",
    "set reminder for",
];

const SCHEDULING_KEYWORDS: &[&str] = &[
    "schedule",
    "remind me",
    "reminder",
    "meeting",
    "event",
    "appointment",
    "call",
    "deadline",
    "set up",
    "book",
    "reserve",
];

const WEEKDAYS: &[(&str, Weekday)] = &[
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

/// True when the text carries both a scheduling keyword and a time
/// indicator.
pub fn has_scheduling_intent(text: &str) -> bool {
    let lower = text.to_lowercase();
    let has_keyword = SCHEDULING_KEYWORDS.iter().any(|kw| lower.contains(kw));
    let has_time = has_time_indicator(&lower);
    has_keyword && has_time
}

fn has_time_indicator(lower: &str) -> bool {
    if ["tomorrow", "today", "tonight", "next week", "next month"]
        .iter()
        .any(|w| lower.contains(w))
    {
        return true;
    }
    if WEEKDAYS.iter().any(|(name, _)| lower.contains(name)) {
        return true;
    }
    if lower
        .split_whitespace()
        .any(|token| parse_clock_token(token).is_some())
    {
        return true;
    }
    // "at 5" with a bare digit still signals a time.
    lower
        .find("at ")
        .and_then(|i| lower[i + 3..].chars().next())
        .is_some_and(|c| c.is_ascii_digit())
}

/// Parse a clock token: `2pm`, `9:30am`, `14:30`.
fn parse_clock_token(token: &str) -> Option<NaiveTime> {
    let token = token.trim_matches(|c: char| c == ',' || c == '.');

    let (digits, meridiem) = if let Some(d) = token.strip_suffix("pm") {
        (d, Some(12u32))
    } else if let Some(d) = token.strip_suffix("am") {
        (d, Some(0u32))
    } else {
        (token, None)
    };

    let (hour_str, minute_str) = match digits.split_once(':') {
        Some((h, m)) => (h, m),
        None => (digits, "0"),
    };
    if hour_str.is_empty() || !hour_str.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if !minute_str.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let mut hour: u32 = hour_str.parse().ok()?;
    let minute: u32 = minute_str.parse().ok()?;

    match meridiem {
        Some(offset) => {
            if hour == 0 || hour > 12 {
                return None;
            }
            hour = (hour % 12) + offset;
        }
        // Bare numbers without a colon are too ambiguous ("call 5 people").
        None if !digits.contains(':') => return None,
        None => {}
    }

    NaiveTime::from_hms_opt(hour, minute, 0)
}

fn days_until_weekday(from: DateTime<Utc>, target: Weekday) -> i64 {
    let today = from.weekday().num_days_from_monday() as i64;
    let target = target.num_days_from_monday() as i64;
    let mut delta = target - today;
    if delta <= 0 {
        delta += 7;
    }
    delta
}

struct DateMatch {
    /// Day offset from `now`, or an absolute weekday target.
    date: DateTarget,
    /// The matched words, removed from the title.
    consumed: Vec<String>,
    /// Time implied by the day word itself (e.g. tonight).
    implied_time: Option<NaiveTime>,
}

enum DateTarget {
    Offset(i64),
    NextWeekday(Weekday),
}

fn find_date_words(lower: &str) -> Option<DateMatch> {
    if lower.contains("tomorrow") {
        return Some(DateMatch {
            date: DateTarget::Offset(1),
            consumed: vec!["tomorrow".into()],
            implied_time: None,
        });
    }
    if lower.contains("tonight") {
        return Some(DateMatch {
            date: DateTarget::Offset(0),
            consumed: vec!["tonight".into()],
            implied_time: NaiveTime::from_hms_opt(20, 0, 0),
        });
    }
    if lower.contains("today") {
        return Some(DateMatch {
            date: DateTarget::Offset(0),
            consumed: vec!["today".into()],
            implied_time: None,
        });
    }
    if lower.contains("next week") {
        return Some(DateMatch {
            date: DateTarget::Offset(7),
            consumed: vec!["next".into(), "week".into()],
            implied_time: None,
        });
    }
    for (name, weekday) in WEEKDAYS {
        if lower.contains(name) {
            let mut consumed = vec![(*name).to_string()];
            if lower.contains(&format!("next {name}")) {
                consumed.push("next".into());
            }
            if lower.contains(&format!("on {name}")) {
                consumed.push("on".into());
            }
            return Some(DateMatch {
                date: DateTarget::NextWeekday(*weekday),
                consumed,
                implied_time: None,
            });
        }
    }
    None
}

/// Parse a scheduling phrase relative to `now`. Returns `None` when no
/// date expression is found.
pub fn parse_event(text: &str, now: DateTime<Utc>) -> Option<ParsedEvent> {
    let lower = text.to_lowercase();

    let mut cleaned = lower.clone();
    for prefix in PREFIXES {
        if let Some(rest) = cleaned.strip_prefix(prefix) {
            cleaned = rest.trim_start().to_string();
            break;
        }
    }

    let date_match = find_date_words(&cleaned)?;

    // Scan for a clock time among the remaining tokens.
    let mut time = date_match.implied_time;
    let mut time_tokens: Vec<String> = Vec::new();
    let tokens: Vec<&str> = cleaned.split_whitespace().collect();
    for (i, token) in tokens.iter().enumerate() {
        if let Some(parsed) = parse_clock_token(token) {
            time = Some(parsed);
            time_tokens.push((*token).to_string());
            // Consume a preceding "at".
            if i > 0 && tokens[i - 1] == "at" {
                time_tokens.push("at".into());
            }
            break;
        }
    }

    let time = time.unwrap_or_else(|| NaiveTime::from_hms_opt(DEFAULT_HOUR, 0, 0).unwrap());

    let day = match date_match.date {
        DateTarget::Offset(days) => now.date_naive() + Duration::days(days),
        DateTarget::NextWeekday(weekday) => {
            now.date_naive() + Duration::days(days_until_weekday(now, weekday))
        }
    };
    let date_time = Utc.from_utc_datetime(&day.and_time(time));

    // Title: everything not consumed by date/time words.
    let consumed: Vec<&str> = date_match
        .consumed
        .iter()
        .map(String::as_str)
        .chain(time_tokens.iter().map(String::as_str))
        .collect();
    let title_words: Vec<&str> = tokens
        .iter()
        .filter(|t| !consumed.contains(&**t))
        .copied()
        .collect();
    let title = clean_title(&title_words.join(" "));

    Some(ParsedEvent { title, date_time })
}

/// Strip connecting words and capitalize.
fn clean_title(raw: &str) -> String {
    let mut title = raw.trim();
    for word in ["for ", "to ", "about ", "at ", "on "] {
        if let Some(rest) = title.strip_prefix(word) {
            title = rest.trim_start();
        }
    }
    for word in [" for", " to", " about", " at", " on"] {
        if let Some(rest) = title.strip_suffix(word) {
            title = rest.trim_end();
        }
    }

    let title = title.trim();
    if title.is_empty() {
        return "Untitled Event".to_string();
    }
    let mut chars = title.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => "Untitled Event".to_string(),
    }
}

/// Build an event from a parsed phrase with all reminder leads enabled.
pub fn event_from_parsed(parsed: &ParsedEvent) -> Event {
    Event::new(parsed.title.clone(), parsed.date_time)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    // A Monday.
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, 8, 0, 0).unwrap()
    }

    #[test]
    fn test_tomorrow_with_pm_time() {
        let parsed = parse_event("Schedule meeting with john tomorrow at 2pm", now()).unwrap();
        assert_eq!(parsed.title, "Meeting with john");
        assert_eq!(parsed.date_time.date_naive(), now().date_naive() + Duration::days(1));
        assert_eq!(parsed.date_time.hour(), 14);
        assert_eq!(parsed.date_time.minute(), 0);
    }

    #[test]
    fn test_weekday_with_am_time() {
        let parsed = parse_event("Remind me to call mom on friday at 10am", now()).unwrap();
        assert_eq!(parsed.title, "Call mom");
        assert_eq!(parsed.date_time.weekday(), Weekday::Fri);
        assert!(parsed.date_time > now());
        assert_eq!(parsed.date_time.hour(), 10);
    }

    #[test]
    fn test_minutes_in_clock_token() {
        let parsed = parse_event("Team standup next monday 9:30am", now()).unwrap();
        assert_eq!(parsed.title, "Team standup");
        assert_eq!(parsed.date_time.weekday(), Weekday::Mon);
        assert_eq!(parsed.date_time.hour(), 9);
        assert_eq!(parsed.date_time.minute(), 30);
        // "next monday" from a Monday is a week out, not today.
        assert_eq!(parsed.date_time.date_naive(), now().date_naive() + Duration::days(7));
    }

    #[test]
    fn test_tonight_implies_evening() {
        let parsed = parse_event("remind me to pay rent tonight", now()).unwrap();
        assert_eq!(parsed.title, "Pay rent");
        assert_eq!(parsed.date_time.hour(), 20);
        assert_eq!(parsed.date_time.date_naive(), now().date_naive());
    }

    #[test]
    fn test_default_morning_hour() {
        let parsed = parse_event("dentist appointment tomorrow", now()).unwrap();
        assert_eq!(parsed.date_time.hour(), DEFAULT_HOUR);
    }

    #[test]
    fn test_twenty_four_hour_time() {
        let parsed = parse_event("budget review tomorrow at 14:30", now()).unwrap();
        assert_eq!(parsed.date_time.hour(), 14);
        assert_eq!(parsed.date_time.minute(), 30);
    }

    #[test]
    fn test_no_date_returns_none() {
        assert!(parse_event("buy some milk", now()).is_none());
    }

    #[test]
    fn test_bare_number_not_a_time() {
        // "call 5 people" has no time; "5" alone must not parse as 5:00.
        assert!(parse_clock_token("5").is_none());
        assert!(parse_clock_token("2pm").is_some());
        assert!(parse_clock_token("14:30").is_some());
        assert!(parse_clock_token("13pm").is_none());
    }

    #[test]
    fn test_empty_title_fallback() {
        let parsed = parse_event("schedule tomorrow at 2pm", now()).unwrap();
        assert_eq!(parsed.title, "Untitled Event");
    }

    #[test]
    fn test_event_from_parsed_enables_all_reminders() {
        let parsed = parse_event("pay rent tomorrow", now()).unwrap();
        let event = event_from_parsed(&parsed);
        assert_eq!(event.title, "Pay rent");
        assert!(event.reminders.two_days && event.reminders.one_hour);
        assert!(!event.reminders_sent.two_days);
    }

    #[test]
    fn test_scheduling_intent() {
        assert!(has_scheduling_intent("schedule meeting tomorrow"));
        assert!(has_scheduling_intent("remind me to pay rent on friday"));
        assert!(!has_scheduling_intent("schedule something sometime"));
        assert!(!has_scheduling_intent("tomorrow will be sunny"));
    }
}
