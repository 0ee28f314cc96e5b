//! Remote calendar mirror.
//!
//! Mirrors local events into an external Google-style calendar over
//! its REST API. Mirroring is best-effort: the caller stores the
//! remote event id on success and carries on without it on failure.

use chrono::Duration;
use fiscus_core::config::CalendarConfig;
use fiscus_core::error::FiscusError;
use fiscus_core::types::Event;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default duration in hours assigned to mirrored events.
const EVENT_DURATION_HOURS: i64 = 1;

/// Remote calendar API client.
pub struct CalendarClient {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
    calendar_id: String,
}

#[derive(Serialize)]
struct RemoteEventBody {
    summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    start: RemoteTime,
    end: RemoteTime,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RemoteTime {
    date_time: String,
}

#[derive(Deserialize)]
struct RemoteEvent {
    id: String,
}

impl CalendarClient {
    pub fn from_config(config: &CalendarConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.clone(),
            access_token: config.access_token.clone(),
            calendar_id: config.calendar_id.clone(),
        }
    }

    /// The mirror is usable once an access token is configured.
    pub fn is_configured(&self) -> bool {
        !self.access_token.is_empty()
    }

    fn events_url(&self) -> String {
        format!(
            "{}/calendars/{}/events",
            self.base_url.trim_end_matches('/'),
            self.calendar_id
        )
    }

    fn body_for(event: &Event) -> RemoteEventBody {
        RemoteEventBody {
            summary: event.title.clone(),
            description: event.description.clone(),
            start: RemoteTime {
                date_time: event.date_time.to_rfc3339(),
            },
            end: RemoteTime {
                date_time: (event.date_time + Duration::hours(EVENT_DURATION_HOURS)).to_rfc3339(),
            },
        }
    }

    /// Create the remote copy of an event. Returns the remote event id.
    pub async fn insert(&self, event: &Event) -> Result<String, FiscusError> {
        debug!("calendar: insert '{}'", event.title);
        let resp = self
            .client
            .post(self.events_url())
            .bearer_auth(&self.access_token)
            .json(&Self::body_for(event))
            .send()
            .await
            .map_err(|e| FiscusError::Calendar(format!("insert failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(FiscusError::Calendar(format!(
                "insert returned {}",
                resp.status()
            )));
        }

        let remote: RemoteEvent = resp
            .json()
            .await
            .map_err(|e| FiscusError::Calendar(format!("failed to parse insert response: {e}")))?;
        Ok(remote.id)
    }

    /// Update the remote copy identified by `remote_id`.
    pub async fn update(&self, remote_id: &str, event: &Event) -> Result<(), FiscusError> {
        debug!("calendar: update '{}'", event.title);
        let url = format!("{}/{remote_id}", self.events_url());
        let resp = self
            .client
            .put(&url)
            .bearer_auth(&self.access_token)
            .json(&Self::body_for(event))
            .send()
            .await
            .map_err(|e| FiscusError::Calendar(format!("update failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(FiscusError::Calendar(format!(
                "update returned {}",
                resp.status()
            )));
        }
        Ok(())
    }

    /// Delete the remote copy identified by `remote_id`.
    pub async fn delete(&self, remote_id: &str) -> Result<(), FiscusError> {
        debug!("calendar: delete {remote_id}");
        let url = format!("{}/{remote_id}", self.events_url());
        let resp = self
            .client
            .delete(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| FiscusError::Calendar(format!("delete failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(FiscusError::Calendar(format!(
                "delete returned {}",
                resp.status()
            )));
        }
        Ok(())
    }
}
