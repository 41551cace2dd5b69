//! Concurrency-safe store of jobs keyed by [`JobKey`].
//!
//! The registry is the single source of truth for "does work for this key
//! exist". Callers only ever see cloned snapshots; every mutation goes
//! through [`JobRegistry::apply_update`].

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use preview_core::job::{Job, JobKey, JobState, JobUpdate};
use preview_core::types::Timestamp;

use crate::error::RegistryError;

/// Process-wide job map.
///
/// Backed by a sharded map, so operations on different keys do not contend
/// on a single lock.
#[derive(Default)]
pub struct JobRegistry {
    jobs: DashMap<JobKey, Job>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the job for `key`, if any.
    pub fn get(&self, key: &JobKey) -> Option<Job> {
        self.jobs.get(key).map(|entry| entry.value().clone())
    }

    /// Atomically look up or register the job for `key`.
    ///
    /// Returns the existing job with `created = false`, or a new job (moved
    /// from `Pending` to `Running`) with `created = true`. Only the caller
    /// that sees `created = true` may start a runner for the key.
    pub fn create_if_absent(&self, key: JobKey, expected_count: Option<usize>) -> (Job, bool) {
        match self.jobs.entry(key) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                let mut job = Job::new(entry.key().clone(), expected_count);
                job.apply(JobUpdate::state(JobState::Running))
                    .expect("a pending job always accepts Running");
                let snapshot = job.clone();
                entry.insert(job);
                (snapshot, true)
            }
        }
    }

    /// Merge `update` into the job for `key` and return the new snapshot.
    pub fn apply_update(&self, key: &JobKey, update: JobUpdate) -> Result<Job, RegistryError> {
        let mut entry = self
            .jobs
            .get_mut(key)
            .ok_or_else(|| RegistryError::UnknownKey(key.to_string()))?;
        entry.apply(update)?;
        Ok(entry.value().clone())
    }

    /// Remove terminal jobs that ended at or before `cutoff`. Returns how many
    /// were removed. Running jobs are never evicted.
    pub fn evict_terminal_before(&self, cutoff: Timestamp) -> usize {
        let mut evicted = 0;
        self.jobs.retain(|_, job| {
            let expired = job.is_terminal() && job.ended_at().is_some_and(|ended| ended <= cutoff);
            if expired {
                evicted += 1;
            }
            !expired
        });
        evicted
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
