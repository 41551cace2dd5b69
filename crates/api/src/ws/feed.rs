//! Encoding of progress events into WebSocket frames.

use axum::extract::ws::Message;
use preview_core::job::{Job, JobKey};
use preview_events::JobEvent;
use serde::Serialize;

use crate::response::JobView;

/// Which jobs a connection follows.
#[derive(Debug, Clone, Default)]
pub struct FeedFilter {
    key: Option<JobKey>,
}

impl FeedFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn job(key: JobKey) -> Self {
        Self { key: Some(key) }
    }

    pub fn key(&self) -> Option<&JobKey> {
        self.key.as_ref()
    }

    pub fn accepts(&self, event: &JobEvent) -> bool {
        match &self.key {
            Some(key) => *key == event.job_key,
            None => true,
        }
    }
}

/// First frame sent to a connection following a known job.
#[derive(Serialize)]
#[serde(tag = "type", rename = "snapshot")]
struct Snapshot {
    job: JobView,
}

pub fn snapshot_message(job: &Job) -> Option<Message> {
    encode(&Snapshot {
        job: JobView::from(job),
    })
}

pub fn event_message(event: &JobEvent) -> Option<Message> {
    encode(event)
}

fn encode<T: Serialize>(value: &T) -> Option<Message> {
    match serde_json::to_string(value) {
        Ok(text) => Some(Message::Text(text.into())),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode WebSocket frame");
            None
        }
    }
}
