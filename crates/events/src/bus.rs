//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`JobEvent`]s. It is shared
//! via `Arc<EventBus>` between job runners (producers) and live observers
//! such as WebSocket connections (consumers).

use chrono::{DateTime, Utc};
use preview_core::job::{Artifact, JobKey};
use preview_core::stage::Stage;
use serde::Serialize;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// JobEvent
// ---------------------------------------------------------------------------

/// What happened to a job.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum JobEventKind {
    /// The project was resolved and task processing is about to begin.
    JobStarted { expected_count: usize },

    /// A task finished and its image is available.
    ArtifactReady {
        artifact: Artifact,
        produced: usize,
        expected_count: usize,
    },

    /// A task failed and was skipped.
    TaskFailed {
        task: String,
        stage: Stage,
        error: String,
    },

    /// Every task has been processed.
    JobCompleted {
        produced: usize,
        expected_count: usize,
    },

    /// The job could not run at all.
    JobFailed { error: String },
}

/// A progress event for one job.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobEvent {
    pub job_key: JobKey,

    #[serde(flatten)]
    pub kind: JobEventKind,

    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl JobEvent {
    pub fn new(job_key: JobKey, kind: JobEventKind) -> Self {
        Self {
            job_key,
            kind,
            timestamp: Utc::now(),
        }
    }

    /// Whether this event ends the job's event sequence.
    pub fn is_final(&self) -> bool {
        matches!(
            self.kind,
            JobEventKind::JobCompleted { .. } | JobEventKind::JobFailed { .. }
        )
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// # Usage
///
/// ```rust
/// use preview_core::job::JobKey;
/// use preview_events::{EventBus, JobEvent, JobEventKind};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// let key = JobKey::parse("app-1").unwrap();
/// bus.publish(JobEvent::new(key, JobEventKind::JobStarted { expected_count: 3 }));
/// ```
pub struct EventBus {
    sender: broadcast::Sender<JobEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: JobEvent) {
        match self.sender.send(event) {
            Ok(receivers) => tracing::trace!(receivers, "Job event published"),
            // Only means there are zero receivers.
            Err(_) => tracing::trace!("Job event dropped, no subscribers"),
        }
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn key() -> JobKey {
        JobKey::parse("app-1").unwrap()
    }

    #[tokio::test]
    async fn publish_and_receive_single_subscriber() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();

        bus.publish(JobEvent::new(
            key(),
            JobEventKind::JobStarted { expected_count: 3 },
        ));

        let received = rx.recv().await.expect("should receive the event");
        assert_eq!(received.job_key, key());
        assert!(matches!(
            received.kind,
            JobEventKind::JobStarted { expected_count: 3 }
        ));
    }

    #[tokio::test]
    async fn multiple_subscribers_receive_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(JobEvent::new(
            key(),
            JobEventKind::JobFailed {
                error: "boom".into(),
            },
        ));

        let e1 = rx1.recv().await.expect("subscriber 1 should receive");
        let e2 = rx2.recv().await.expect("subscriber 2 should receive");

        assert!(e1.is_final());
        assert!(e2.is_final());
    }

    #[test]
    fn publish_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        assert_eq!(bus.subscriber_count(), 0);
        bus.publish(JobEvent::new(
            key(),
            JobEventKind::JobCompleted {
                produced: 0,
                expected_count: 0,
            },
        ));
    }

    #[test]
    fn serializes_with_type_tag() {
        let event = JobEvent::new(
            key(),
            JobEventKind::ArtifactReady {
                artifact: Artifact {
                    task: "Home".into(),
                    path: PathBuf::from("results/app-1/Home.png"),
                    url: "/results/app-1/Home.png".into(),
                },
                produced: 1,
                expected_count: 2,
            },
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "artifact_ready");
        assert_eq!(json["jobKey"], "app-1");
        assert_eq!(json["expectedCount"], 2);
        assert_eq!(json["artifact"]["url"], "/results/app-1/Home.png");
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn task_failure_names_stage() {
        let event = JobEvent::new(
            key(),
            JobEventKind::TaskFailed {
                task: "Home".into(),
                stage: Stage::Capture,
                error: "exit 1".into(),
            },
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "task_failed");
        assert_eq!(json["stage"], "capture");
        assert!(!event.is_final());
    }
}
