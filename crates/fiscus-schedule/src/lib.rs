//! # fiscus-schedule
//!
//! Scheduling: recurring-pattern detection, smart suggestions,
//! natural-language event parsing, reminders, and the remote calendar
//! mirror.

pub mod calendar;
pub mod parser;
pub mod patterns;
pub mod reminders;
pub mod suggest;

pub use calendar::CalendarClient;
pub use patterns::{detect_recurring_patterns, PatternKind, RecurringPattern};
pub use suggest::{smart_suggestions, Suggestion};
