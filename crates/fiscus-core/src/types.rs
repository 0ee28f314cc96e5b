use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single chat message in the conversation history.
///
/// Append-only: messages are never edited once stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub text: String,
    /// True for user messages, false for assistant responses.
    pub is_user: bool,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a message timestamped now.
    pub fn new(text: impl Into<String>, is_user: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            is_user,
            timestamp: Utc::now(),
        }
    }
}

/// The four reminder lead times supported per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReminderLead {
    TwoDays,
    OneDay,
    SixHours,
    OneHour,
}

impl ReminderLead {
    /// All leads, longest first.
    pub const ALL: [ReminderLead; 4] = [
        ReminderLead::TwoDays,
        ReminderLead::OneDay,
        ReminderLead::SixHours,
        ReminderLead::OneHour,
    ];

    /// How long before the event this reminder fires.
    pub fn offset(&self) -> Duration {
        match self {
            Self::TwoDays => Duration::days(2),
            Self::OneDay => Duration::days(1),
            Self::SixHours => Duration::hours(6),
            Self::OneHour => Duration::hours(1),
        }
    }

    /// Human-readable label used in reminder delivery.
    pub fn label(&self) -> &'static str {
        match self {
            Self::TwoDays => "in 2 days",
            Self::OneDay => "tomorrow",
            Self::SixHours => "in 6 hours",
            Self::OneHour => "in 1 hour",
        }
    }
}

/// Per-lead boolean flags, used both for "wanted" and "already sent".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderFlags {
    pub two_days: bool,
    pub one_day: bool,
    pub six_hours: bool,
    pub one_hour: bool,
}

impl ReminderFlags {
    /// All four leads enabled.
    pub fn all() -> Self {
        Self {
            two_days: true,
            one_day: true,
            six_hours: true,
            one_hour: true,
        }
    }

    pub fn get(&self, lead: ReminderLead) -> bool {
        match lead {
            ReminderLead::TwoDays => self.two_days,
            ReminderLead::OneDay => self.one_day,
            ReminderLead::SixHours => self.six_hours,
            ReminderLead::OneHour => self.one_hour,
        }
    }

    pub fn set(&mut self, lead: ReminderLead, value: bool) {
        match lead {
            ReminderLead::TwoDays => self.two_days = value,
            ReminderLead::OneDay => self.one_day = value,
            ReminderLead::SixHours => self.six_hours = value,
            ReminderLead::OneHour => self.one_hour = value,
        }
    }
}

/// A scheduled event with reminder lead-time flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub date_time: DateTime<Utc>,
    /// Which reminder leads the user wants.
    #[serde(default)]
    pub reminders: ReminderFlags,
    /// Which reminders have already been delivered.
    #[serde(default)]
    pub reminders_sent: ReminderFlags,
    /// Id of the mirrored event in the external calendar, if synced.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calendar_event_id: Option<String>,
}

impl Event {
    /// Create an event with all reminders enabled and none sent.
    pub fn new(title: impl Into<String>, date_time: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: None,
            date_time,
            reminders: ReminderFlags::all(),
            reminders_sent: ReminderFlags::default(),
            calendar_event_id: None,
        }
    }
}

/// Whether money came in or went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

/// A categorized financial transaction. Amount is always non-negative;
/// `kind` carries the sign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub date: DateTime<Utc>,
    pub description: String,
    pub amount: f64,
    pub kind: TransactionKind,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
}

/// Income/expense totals over a set of transactions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub total_income: f64,
    pub total_expenses: f64,
    pub balance: f64,
}

impl BalanceSheet {
    pub fn from_transactions(transactions: &[Transaction]) -> Self {
        let mut total_income = 0.0;
        let mut total_expenses = 0.0;
        for t in transactions {
            match t.kind {
                TransactionKind::Income => total_income += t.amount,
                TransactionKind::Expense => total_expenses += t.amount,
            }
        }
        Self {
            total_income,
            total_expenses,
            balance: total_income - total_expenses,
        }
    }
}

/// Device-local user profile. `avatar` selects one of four presets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub avatar: u8,
}

impl UserProfile {
    /// Create a profile, clamping the avatar selector to 1..=4.
    pub fn new(name: impl Into<String>, avatar: u8) -> Self {
        Self {
            name: name.into(),
            avatar: avatar.clamp(1, 4),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reminder_flags_get_set() {
        let mut flags = ReminderFlags::default();
        assert!(!flags.get(ReminderLead::OneHour));
        flags.set(ReminderLead::OneHour, true);
        assert!(flags.get(ReminderLead::OneHour));
        assert!(!flags.get(ReminderLead::TwoDays));
    }

    #[test]
    fn test_reminder_offsets_ordered() {
        let offsets: Vec<_> = ReminderLead::ALL.iter().map(|l| l.offset()).collect();
        for pair in offsets.windows(2) {
            assert!(pair[0] > pair[1], "leads should be longest first");
        }
    }

    #[test]
    fn test_event_new_defaults() {
        let e = Event::new("Dentist", Utc::now());
        assert!(e.reminders.get(ReminderLead::TwoDays));
        assert!(!e.reminders_sent.get(ReminderLead::TwoDays));
        assert!(e.calendar_event_id.is_none());
    }

    #[test]
    fn test_event_serde_round_trip() {
        let e = Event::new("Rent due", Utc::now());
        let json = serde_json::to_string(&e).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, e.id);
        assert_eq!(back.title, "Rent due");
        assert_eq!(back.date_time, e.date_time);
    }

    #[test]
    fn test_event_deserialize_without_optional_fields() {
        // Older stored events without sent flags or calendar id should load.
        let json = r#"{"id":"6f6cd7a8-3bd2-4a8f-9a3f-2f4f5b9d1c01","title":"Gym","date_time":"2026-01-05T18:00:00Z","reminders":{"two_days":false,"one_day":true,"six_hours":false,"one_hour":true}}"#;
        let e: Event = serde_json::from_str(json).unwrap();
        assert!(e.reminders.one_day);
        assert!(!e.reminders_sent.one_day);
    }

    #[test]
    fn test_transaction_kind_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&TransactionKind::Expense).unwrap(),
            "\"expense\""
        );
        let k: TransactionKind = serde_json::from_str("\"income\"").unwrap();
        assert_eq!(k, TransactionKind::Income);
    }

    #[test]
    fn test_balance_sheet() {
        let mk = |amount: f64, kind| Transaction {
            id: Uuid::new_v4(),
            date: Utc::now(),
            description: "x".into(),
            amount,
            kind,
            category: "Other Expenses".into(),
            category_confidence: None,
            subcategory: None,
            bank_name: None,
        };
        let txns = vec![
            mk(3500.0, TransactionKind::Income),
            mk(89.99, TransactionKind::Expense),
            mk(125.40, TransactionKind::Expense),
        ];
        let sheet = BalanceSheet::from_transactions(&txns);
        assert!((sheet.total_income - 3500.0).abs() < 1e-9);
        assert!((sheet.total_expenses - 215.39).abs() < 1e-9);
        assert!((sheet.balance - 3284.61).abs() < 1e-9);
    }

    #[test]
    fn test_profile_avatar_clamped() {
        assert_eq!(UserProfile::new("Ana", 0).avatar, 1);
        assert_eq!(UserProfile::new("Ana", 3).avatar, 3);
        assert_eq!(UserProfile::new("Ana", 9).avatar, 4);
    }
}
