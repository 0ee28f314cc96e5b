//! Reminder lead bookkeeping.
//!
//! Each event carries four lead-time flags plus matching "sent" flags.
//! A reminder is due when its lead is enabled, unsent, its trigger time
//! has passed, and the event itself is still in the future.

use chrono::{DateTime, Utc};
use fiscus_core::types::{Event, ReminderLead};

/// Leads currently due for an event, longest first.
pub fn due_leads(event: &Event, now: DateTime<Utc>) -> Vec<ReminderLead> {
    if event.date_time <= now {
        return Vec::new();
    }
    ReminderLead::ALL
        .into_iter()
        .filter(|lead| {
            event.reminders.get(*lead)
                && !event.reminders_sent.get(*lead)
                && now >= event.date_time - lead.offset()
        })
        .collect()
}

/// Mark a lead as delivered.
pub fn mark_sent(event: &mut Event, lead: ReminderLead) {
    event.reminders_sent.set(lead, true);
}

/// After an event is rescheduled, clear sent flags for leads whose
/// trigger time is in the future again so they fire anew.
pub fn rearm_on_update(event: &mut Event, now: DateTime<Utc>) {
    for lead in ReminderLead::ALL {
        if event.reminders_sent.get(lead) && now < event.date_time - lead.offset() {
            event.reminders_sent.set(lead, false);
        }
    }
}
