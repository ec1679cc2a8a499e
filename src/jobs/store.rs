//! In-memory job ledger.
//!
//! The ledger exclusively owns every [`Job`]; the queue refers to jobs by
//! id only.  All access goes through one mutex held just long enough to
//! read or mutate a record, never across inference.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};

use super::job::{Job, JobResult, JobSnapshot};

#[derive(Default)]
pub struct JobStore {
    jobs: Mutex<HashMap<String, Job>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Job>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert(&self, job: Job) {
        self.lock().insert(job.id.clone(), job);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn get(&self, id: &str) -> Option<Job> {
        self.lock().get(id).cloned()
    }

    pub fn snapshot(&self, id: &str, queue_position: Option<usize>) -> Option<JobSnapshot> {
        self.lock().get(id).map(|job| JobSnapshot::of(job, queue_position))
    }

    /// Mark `id` processing and return its job; `None` if the job is gone
    /// or no longer pending.
    pub fn start(&self, id: &str) -> Option<Job> {
        let mut jobs = self.lock();
        let job = jobs.get_mut(id)?;
        job.start().then(|| job.clone())
    }

    pub fn complete(&self, id: &str, result: JobResult) -> bool {
        self.lock()
            .get_mut(id)
            .is_some_and(|job| job.complete(result))
    }

    pub fn fail(&self, id: &str, error: impl Into<String>) -> bool {
        self.lock().get_mut(id).is_some_and(|job| job.fail(error))
    }

    /// Drop terminal jobs that finished more than `retention` before `now`.
    /// Pending and processing jobs are never removed.  Returns the number
    /// of jobs dropped.
    pub fn sweep(&self, retention: Duration, now: DateTime<Utc>) -> usize {
        let cutoff = now - retention;
        let mut jobs = self.lock();
        let before = jobs.len();
        jobs.retain(|_, job| job.finished_at().map_or(true, |t| t >= cutoff));
        let removed = before - jobs.len();
        if removed > 0 {
            log::info!("jobs: swept {removed} expired job(s)");
        }
        removed
    }
}
