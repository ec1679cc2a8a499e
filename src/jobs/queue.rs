//! Bounded FIFO job queue and the single worker that drains it.
//!
//! # Flow
//!
//! ```text
//! submit ─▶ JobQueue::try_push_with(id, JobStore::insert) ──(full)──▶ QueueFull
//!                              │
//! JobWorker::run (one task) ◀── pop_with(JobStore::start)       [processing]
//!   ├─ spawn(executor.execute) under job timeout
//!   │    ├─ Ok       → JobStore::complete            [completed]
//!   │    ├─ panic    → JobStore::fail                [failed]
//!   │    └─ timeout  → JobStore::fail, then wait for the task, result dropped
//!   └─ JobStore::sweep(retention)
//! ```
//!
//! The worker is the only consumer, so jobs run one at a time in FIFO
//! order.  A timed-out job still owns the backend until it returns, so the
//! next job is not started before then.  An empty queue is re-checked every
//! poll interval so shutdown is noticed promptly.
//!
//! Admission, dequeue and poll touch the ledger while holding the queue
//! lock, so a job is never seen out of the queue and still pending.  Lock
//! order is always queue, then ledger.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;

use crate::config::QueueConfig;
use crate::error::ServiceError;
use crate::pipeline::PipelineExecutor;

use super::job::{Job, JobResult};
use super::store::JobStore;

/// Upper bound on the retention window (ten years).
const MAX_RETENTION_SECS: u64 = 10 * 365 * 24 * 3600;

// ---------------------------------------------------------------------------
// JobQueue
// ---------------------------------------------------------------------------

/// FIFO of job ids with a fixed capacity.
pub struct JobQueue {
    ids: Mutex<VecDeque<String>>,
    capacity: usize,
    notify: Notify,
}

impl JobQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            ids: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            notify: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<String>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append `id`, returning its 1-based position.  A full queue rejects
    /// the id immediately.
    pub fn try_push(&self, id: String) -> Result<usize, ServiceError> {
        self.try_push_with(id, || {})
    }

    /// Like [`try_push`](Self::try_push), running `admit` under the queue
    /// lock just before the id is appended.  `admit` is not called when the
    /// queue is full.
    pub fn try_push_with(&self, id: String, admit: impl FnOnce()) -> Result<usize, ServiceError> {
        let position = {
            let mut ids = self.lock();
            if ids.len() >= self.capacity {
                return Err(ServiceError::QueueFull {
                    capacity: self.capacity,
                });
            }
            admit();
            ids.push_back(id);
            ids.len()
        };
        self.notify.notify_one();
        Ok(position)
    }

    pub fn pop(&self) -> Option<String> {
        self.lock().pop_front()
    }

    /// Pop the front id and run `claim` on it before the queue lock is
    /// released.
    pub fn pop_with<T>(&self, claim: impl FnOnce(&str) -> T) -> Option<(String, T)> {
        let mut ids = self.lock();
        let id = ids.pop_front()?;
        let claimed = claim(&id);
        Some((id, claimed))
    }

    /// 1-based position of `id`, if it is still waiting.
    pub fn position(&self, id: &str) -> Option<usize> {
        Self::position_in(&self.lock(), id)
    }

    /// Run `read` with the position of `id` while the queue lock is held.
    pub fn with_position<T>(&self, id: &str, read: impl FnOnce(Option<usize>) -> T) -> T {
        let ids = self.lock();
        read(Self::position_in(&ids, id))
    }

    fn position_in(ids: &VecDeque<String>, id: &str) -> Option<usize> {
        ids.iter().position(|queued| queued == id).map(|i| i + 1)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Wait until an id is pushed or `timeout` elapses.
    pub async fn wait(&self, timeout: Duration) {
        let _ = tokio::time::timeout(timeout, self.notify.notified()).await;
    }
}

// ---------------------------------------------------------------------------
// JobWorker
// ---------------------------------------------------------------------------

/// The single consumer of a [`JobQueue`].
pub struct JobWorker {
    queue: Arc<JobQueue>,
    store: Arc<JobStore>,
    executor: PipelineExecutor,
    job_timeout: Duration,
    retention: chrono::Duration,
    poll_interval: Duration,
}

/// Handle to a running worker.
pub struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WorkerHandle {
    /// Ask the worker to stop and wait for it.  A job already running is
    /// allowed to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            log::error!("queue: worker task ended abnormally: {e}");
        }
    }
}

impl JobWorker {
    pub fn new(
        queue: Arc<JobQueue>,
        store: Arc<JobStore>,
        executor: PipelineExecutor,
        config: &QueueConfig,
    ) -> Self {
        Self {
            queue,
            store,
            executor,
            job_timeout: Duration::from_secs(config.job_timeout_secs),
            retention: chrono::Duration::seconds(
                config.job_retention_secs.min(MAX_RETENTION_SECS) as i64,
            ),
            poll_interval: Duration::from_millis(config.poll_interval_ms.max(1)),
        }
    }

    /// Run the worker loop on the tokio runtime.
    pub fn spawn(self) -> WorkerHandle {
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(self.run(rx));
        WorkerHandle { shutdown: tx, task }
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        log::info!(
            "queue: worker started (capacity {}, job timeout {:?})",
            self.queue.capacity(),
            self.job_timeout
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.queue.pop_with(|id| self.store.start(id)) {
                Some((id, Some(job))) => self.process(&id, job).await,
                Some((id, None)) => {
                    log::warn!("queue: job {id} vanished or was not pending, skipping");
                }
                None => {
                    tokio::select! {
                        _ = self.queue.wait(self.poll_interval) => {}
                        changed = shutdown.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                    }
                }
            }

            self.store.sweep(self.retention, Utc::now());
        }

        log::info!("queue: worker stopped");
    }

    async fn process(&self, id: &str, job: Job) {
        log::info!(
            "queue: processing job {id} ({} remaining)",
            self.queue.len()
        );

        let executor = self.executor.clone();
        let request = job.request;
        let mut task = tokio::spawn(async move {
            let output = executor
                .execute(&request.text, request.pipeline.as_deref(), &request.selectors)
                .await;
            JobResult::from_output(&request.text, output)
        });

        // Generation is not interrupted on timeout; its result is dropped.
        match tokio::time::timeout(self.job_timeout, &mut task).await {
            Ok(Ok(result)) => {
                self.store.complete(id, result);
                log::info!("queue: job {id} completed");
            }
            Ok(Err(e)) => {
                log::error!("queue: job {id} failed: {e}");
                self.store.fail(id, format!("Lỗi xử lý: {e}"));
            }
            Err(_) => {
                log::error!("queue: job {id} timed out after {:?}", self.job_timeout);
                self.store.fail(
                    id,
                    format!("Quá thời gian xử lý ({} giây)", self.job_timeout.as_secs()),
                );
                if let Err(e) = task.await {
                    log::error!("queue: timed-out job {id} ended abnormally: {e}");
                }
                log::debug!("queue: timed-out job {id} released the backend");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::job::{CorrectionRequest, Job, JobStatus};
    use crate::llm::{Correction, CorrectionError, Corrector};
    use crate::pipeline::{BackendKind, BackendSet, PipelineKind};
    use async_trait::async_trait;

    /// Upper-cases its input after an optional delay; panics on "panic".
    struct Shouting {
        delay: Duration,
    }

    #[async_trait]
    impl Corrector for Shouting {
        fn name(&self) -> &str {
            "Qwen"
        }

        async fn correct(&self, text: &str, _v: Option<&str>) -> Result<Correction, CorrectionError> {
            if text == "panic" {
                panic!("backend exploded");
            }
            tokio::time::sleep(self.delay).await;
            Ok(Correction::new(text.to_uppercase(), ""))
        }
    }

    /// One resident model: every call holds the same lock until it returns.
    /// "chậm" takes 1.5 s, anything else 0.7 s.
    #[derive(Default)]
    struct SingleSlot {
        slot: tokio::sync::Mutex<()>,
    }

    #[async_trait]
    impl Corrector for SingleSlot {
        fn name(&self) -> &str {
            "Qwen"
        }

        async fn correct(&self, text: &str, _v: Option<&str>) -> Result<Correction, CorrectionError> {
            let _held = self.slot.lock().await;
            let millis = if text == "chậm" { 1500 } else { 700 };
            tokio::time::sleep(Duration::from_millis(millis)).await;
            Ok(Correction::new(text.to_uppercase(), ""))
        }
    }

    fn executor(delay: Duration) -> PipelineExecutor {
        let backends =
            BackendSet::new().with(BackendKind::LocalLm, Arc::new(Shouting { delay }), true);
        PipelineExecutor::new(backends, 100, PipelineKind::LocalLmOnly)
    }

    fn config(timeout_secs: u64) -> QueueConfig {
        QueueConfig {
            max_queue_size: 10,
            job_timeout_secs: timeout_secs,
            job_retention_secs: 3600,
            poll_interval_ms: 10,
        }
    }

    fn enqueue(store: &JobStore, queue: &JobQueue, text: &str) -> String {
        let job = Job::new(CorrectionRequest {
            text: text.into(),
            ..CorrectionRequest::default()
        });
        let id = job.id.clone();
        store.insert(job);
        queue.try_push(id.clone()).expect("queue has room");
        id
    }

    async fn wait_terminal(store: &JobStore, id: &str) -> JobStatus {
        for _ in 0..500 {
            if let Some(job) = store.get(id) {
                if job.status.is_terminal() {
                    return job.status;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job {id} did not finish");
    }

    #[test]
    fn backpressure_rejects_beyond_capacity() {
        let queue = JobQueue::new(2);
        assert_eq!(queue.try_push("a".into()), Ok(1));
        assert_eq!(queue.try_push("b".into()), Ok(2));
        assert_eq!(
            queue.try_push("c".into()),
            Err(ServiceError::QueueFull { capacity: 2 })
        );
        assert_eq!(queue.len(), queue.capacity());
        assert_eq!(queue.position("c"), None);
    }

    #[test]
    fn fifo_order_and_positions() {
        let queue = JobQueue::new(5);
        for id in ["a", "b", "c"] {
            queue.try_push(id.into()).unwrap();
        }
        assert_eq!(queue.position("c"), Some(3));
        assert_eq!(queue.pop().as_deref(), Some("a"));
        assert_eq!(queue.position("c"), Some(2));
        assert_eq!(queue.pop().as_deref(), Some("b"));
        assert_eq!(queue.pop().as_deref(), Some("c"));
        assert!(queue.pop().is_none());
    }

    #[tokio::test]
    async fn worker_completes_jobs_in_order() {
        let queue = Arc::new(JobQueue::new(10));
        let store = Arc::new(JobStore::new());
        let first = enqueue(&store, &queue, "một");
        let second = enqueue(&store, &queue, "hai");

        let handle = JobWorker::new(queue.clone(), store.clone(), executor(Duration::ZERO), &config(5)).spawn();

        assert_eq!(wait_terminal(&store, &second).await, JobStatus::Completed);
        let first = store.get(&first).unwrap();
        let second = store.get(&second).unwrap();
        assert_eq!(first.result.unwrap().corrected, "MỘT");
        assert!(first.completed_at <= second.started_at);
        assert!(queue.is_empty());

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn worker_survives_a_panicking_job() {
        let queue = Arc::new(JobQueue::new(10));
        let store = Arc::new(JobStore::new());
        let bad = enqueue(&store, &queue, "panic");
        let good = enqueue(&store, &queue, "ổn");

        let handle = JobWorker::new(queue.clone(), store.clone(), executor(Duration::ZERO), &config(5)).spawn();

        assert_eq!(wait_terminal(&store, &bad).await, JobStatus::Failed);
        assert_eq!(wait_terminal(&store, &good).await, JobStatus::Completed);
        assert!(store.get(&bad).unwrap().error.unwrap().starts_with("Lỗi xử lý"));

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn slow_job_times_out_and_is_failed() {
        let queue = Arc::new(JobQueue::new(10));
        let store = Arc::new(JobStore::new());
        let cfg = config(0);
        let slow = enqueue(&store, &queue, "chậm");

        let handle = JobWorker::new(queue.clone(), store.clone(), executor(Duration::from_millis(500)), &cfg).spawn();

        assert_eq!(wait_terminal(&store, &slow).await, JobStatus::Failed);
        let job = store.get(&slow).unwrap();
        assert!(job.error.unwrap().contains("Quá thời gian"));
        assert!(job.result.is_none());

        // The late result is discarded.
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(store.get(&slow).unwrap().status, JobStatus::Failed);

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn next_job_waits_for_a_timed_out_one_to_finish() {
        let queue = Arc::new(JobQueue::new(10));
        let store = Arc::new(JobStore::new());
        let backends =
            BackendSet::new().with(BackendKind::LocalLm, Arc::new(SingleSlot::default()), true);
        let executor = PipelineExecutor::new(backends, 100, PipelineKind::LocalLmOnly);

        let slow = enqueue(&store, &queue, "chậm");
        let fast_one = enqueue(&store, &queue, "nhanh một");
        let fast_two = enqueue(&store, &queue, "nhanh hai");

        let handle = JobWorker::new(queue.clone(), store.clone(), executor, &config(1)).spawn();

        assert_eq!(wait_terminal(&store, &slow).await, JobStatus::Failed);
        assert_eq!(wait_terminal(&store, &fast_one).await, JobStatus::Completed);
        assert_eq!(wait_terminal(&store, &fast_two).await, JobStatus::Completed);

        let slow = store.get(&slow).unwrap();
        let fast_one = store.get(&fast_one).unwrap();
        assert_eq!(fast_one.result.unwrap().corrected, "NHANH MỘT");
        let gap = fast_one.started_at.unwrap() - slow.started_at.unwrap();
        assert!(gap >= chrono::Duration::milliseconds(1400), "started after {gap}");

        handle.shutdown().await;
    }

    #[test]
    fn dequeue_claims_the_job_under_the_queue_lock() {
        let queue = JobQueue::new(5);
        let store = JobStore::new();
        let id = enqueue(&store, &queue, "một hai ba");

        let status = queue.with_position(&id, |pos| store.snapshot(&id, pos).unwrap());
        assert_eq!((status.status, status.queue_position), (JobStatus::Pending, Some(1)));

        let (popped, claimed) = queue.pop_with(|id| store.start(id)).expect("queued");
        assert_eq!(popped, id);
        assert_eq!(claimed.map(|job| job.status), Some(JobStatus::Processing));

        let status = queue.with_position(&id, |pos| store.snapshot(&id, pos).unwrap());
        assert_eq!((status.status, status.queue_position), (JobStatus::Processing, None));
    }

    #[test]
    fn full_queue_does_not_admit() {
        let queue = JobQueue::new(1);
        queue.try_push("a".into()).unwrap();
        let mut admitted = false;
        assert!(queue.try_push_with("b".into(), || admitted = true).is_err());
        assert!(!admitted);
    }

    #[tokio::test]
    async fn worker_picks_up_jobs_submitted_later() {
        let queue = Arc::new(JobQueue::new(10));
        let store = Arc::new(JobStore::new());
        let handle = JobWorker::new(queue.clone(), store.clone(), executor(Duration::ZERO), &config(5)).spawn();

        tokio::time::sleep(Duration::from_millis(30)).await;
        let id = enqueue(&store, &queue, "muộn");
        assert_eq!(wait_terminal(&store, &id).await, JobStatus::Completed);

        handle.shutdown().await;
    }
}
