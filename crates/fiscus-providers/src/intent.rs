//! Keyword-based intent detection over user input.

use serde::{Deserialize, Serialize};

/// High-level intent of a user message, used by the UI to route follow-ups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    ScheduleMeeting,
    ConvertCurrency,
    AnalyzeExpense,
    General,
}

/// Currency codes recognized in amount expressions like "100 USD".
const CURRENCY_CODES: &[&str] = &["usd", "eur", "gbp", "jpy", "cad", "aud"];

/// Detect the intent of a user message by keyword matching.
///
/// Checks run in priority order: scheduling beats currency beats expenses.
pub fn detect(input: &str) -> Intent {
    let lower = input.to_lowercase();

    if ["schedule", "meeting", "event", "remind", "calendar"]
        .iter()
        .any(|kw| lower.contains(kw))
    {
        return Intent::ScheduleMeeting;
    }

    if lower.contains("convert") || lower.contains("currency") || has_amount_with_code(&lower) {
        return Intent::ConvertCurrency;
    }

    if ["expense", "spend", "transaction", "budget", "finance", "money"]
        .iter()
        .any(|kw| lower.contains(kw))
    {
        return Intent::AnalyzeExpense;
    }

    Intent::General
}

/// True if the text contains a number immediately followed (modulo
/// whitespace) by a known currency code, e.g. "250 usd" or "99eur".
fn has_amount_with_code(lower: &str) -> bool {
    let bytes = lower.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if !b.is_ascii_digit() {
            continue;
        }
        // Skip past the rest of the number.
        let mut j = i;
        while j < bytes.len() && (bytes[j].is_ascii_digit() || bytes[j] == b'.') {
            j += 1;
        }
        while j < bytes.len() && bytes[j] == b' ' {
            j += 1;
        }
        let rest = &lower[j..];
        if CURRENCY_CODES.iter().any(|code| rest.starts_with(code)) {
            return true;
        }
    }
    false
}
