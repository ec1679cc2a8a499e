//! Asynchronous correction jobs.
//!
//! * [`Job`] / [`JobStatus`] — one queued unit of work and its lifecycle.
//! * [`JobStore`] — in-memory ledger owning every job, with a TTL sweep.
//! * [`JobQueue`] — bounded FIFO of job ids.
//! * [`JobWorker`] — the single consumer that runs jobs one at a time.

pub mod job;
pub mod queue;
pub mod store;

pub use job::{CorrectionRequest, Job, JobResult, JobSnapshot, JobStatus};
pub use queue::{JobQueue, JobWorker, WorkerHandle};
pub use store::JobStore;
