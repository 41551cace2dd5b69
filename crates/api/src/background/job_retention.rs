//! Periodic eviction of finished jobs from the registry.
//!
//! Jobs in `Done` or `Error` whose `ended_at` is older than the retention
//! period are removed, so a later `generate` for the same key starts fresh.
//! Running jobs are never evicted.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use preview_pipeline::JobRegistry;
use tokio_util::sync::CancellationToken;

/// Evict terminal jobs that ended more than `retention` ago.
pub fn sweep(registry: &JobRegistry, retention: Duration) -> usize {
    let retention = chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::MAX);
    let cutoff = Utc::now()
        .checked_sub_signed(retention)
        .unwrap_or(chrono::DateTime::<Utc>::MIN_UTC);
    registry.evict_terminal_before(cutoff)
}

/// Run the job retention loop until `cancel` is triggered.
pub async fn run(
    registry: Arc<JobRegistry>,
    retention: Duration,
    interval: Duration,
    cancel: CancellationToken,
) {
    tracing::info!(
        retention_secs = retention.as_secs(),
        interval_secs = interval.as_secs(),
        "Job retention sweeper started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Job retention sweeper stopping");
                break;
            }
            _ = ticker.tick() => {
                let evicted = sweep(&registry, retention);
                if evicted > 0 {
                    tracing::info!(evicted, remaining = registry.len(), "Job retention: evicted finished jobs");
                } else {
                    tracing::debug!("Job retention: nothing to evict");
                }
            }
        }
    }
}
