//! Vietnamese text correction through chained correction models.
//!
//! * [`text`] — sentence-bounded chunking, word diff and change notes.
//! * [`llm`] — correction backends and structured-output parsing.
//! * [`pipeline`] — named strategies, fallback resolution, batch runs.
//! * [`jobs`] — bounded job queue, ledger and single worker.
//! * [`service`] — the operations front ends call.

pub mod config;
pub mod error;
pub mod jobs;
pub mod llm;
pub mod pipeline;
pub mod service;
pub mod text;

pub use error::ServiceError;
pub use service::{CorrectionService, HealthReport, SyncResult};
