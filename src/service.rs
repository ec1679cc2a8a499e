//! Core-facing correction service.
//!
//! [`CorrectionService`] is what an HTTP layer, a GUI or the CLI talks to:
//!
//! * [`submit`](CorrectionService::submit) / [`poll`](CorrectionService::poll)
//!   go through the bounded job queue and the single worker.
//! * [`correct_sync`](CorrectionService::correct_sync) and
//!   [`correct_batch`](CorrectionService::correct_batch) run inline on the
//!   caller's task and compete with the worker for the model lock.
//! * [`health`](CorrectionService::health) reports backend availability,
//!   variants and valid pipeline names.

use std::sync::Arc;

use serde::Serialize;

use crate::config::{AppConfig, QueueConfig};
use crate::error::ServiceError;
use crate::jobs::{CorrectionRequest, Job, JobQueue, JobSnapshot, JobStore, JobWorker, WorkerHandle};
use crate::llm::Corrector;
use crate::pipeline::{
    BackendKind, BackendSelectors, BackendSet, BatchCoordinator, BatchOutput, PipelineExecutor,
    PipelineKind,
};
use crate::text::change_note;

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Result of [`CorrectionService::correct_sync`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncResult {
    pub original: String,
    pub corrected: String,
    pub primary_output: String,
    pub explanation: String,
    /// Change report; empty when nothing changed.
    pub note: String,
    pub pipeline: PipelineKind,
}

/// One backend in a [`HealthReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackendHealth {
    pub kind: BackendKind,
    pub name: String,
    pub available: bool,
    pub variants: Vec<String>,
    pub default_variant: Option<String>,
}

/// Capability introspection for callers populating choices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub backends: Vec<BackendHealth>,
    pub pipelines: Vec<&'static str>,
    pub default_pipeline: PipelineKind,
    pub queue_size: usize,
    pub queue_capacity: usize,
}

// ---------------------------------------------------------------------------
// CorrectionService
// ---------------------------------------------------------------------------

pub struct CorrectionService {
    executor: PipelineExecutor,
    batch: BatchCoordinator,
    store: Arc<JobStore>,
    queue: Arc<JobQueue>,
    queue_config: QueueConfig,
}

impl CorrectionService {
    pub fn new(backends: BackendSet, config: &AppConfig) -> Self {
        let default_pipeline = config
            .pipeline
            .default_pipeline
            .parse()
            .unwrap_or_else(|e| {
                log::warn!("service: {e} in config, using '{}'", PipelineKind::LocalLmRefine);
                PipelineKind::LocalLmRefine
            });

        let executor = PipelineExecutor::new(
            backends,
            config.pipeline.max_words_per_chunk,
            default_pipeline,
        );

        Self {
            batch: BatchCoordinator::new(executor.clone()),
            executor,
            store: Arc::new(JobStore::new()),
            queue: Arc::new(JobQueue::new(config.queue.max_queue_size)),
            queue_config: config.queue.clone(),
        }
    }

    /// Probe every backend described by `config`, then build the service.
    pub async fn from_config(config: &AppConfig) -> Self {
        let backends = BackendSet::from_config(config).await;
        Self::new(backends, config)
    }

    /// Start the single job worker.
    pub fn start_worker(&self) -> WorkerHandle {
        JobWorker::new(
            Arc::clone(&self.queue),
            Arc::clone(&self.store),
            self.executor.clone(),
            &self.queue_config,
        )
        .spawn()
    }

    /// Queue `request` for the worker and return its job id.
    ///
    /// Never waits on inference.  Fails when the text is empty or the queue
    /// is at capacity; in both cases nothing is left in the ledger.
    pub fn submit(&self, mut request: CorrectionRequest) -> Result<String, ServiceError> {
        request.text = validate(&request.text)?.to_string();

        let job = Job::new(request);
        let id = job.id.clone();

        match self.queue.try_push_with(id.clone(), || self.store.insert(job)) {
            Ok(position) => {
                log::info!("service: job {id} queued at position {position}");
                Ok(id)
            }
            Err(e) => {
                log::warn!("service: {e}");
                Err(e)
            }
        }
    }

    /// Current state of job `id`.
    pub fn poll(&self, id: &str) -> Result<JobSnapshot, ServiceError> {
        self.queue
            .with_position(id, |position| self.store.snapshot(id, position))
            .ok_or_else(|| ServiceError::JobNotFound(id.to_string()))
    }

    /// Correct `text` inline.
    pub async fn correct_sync(
        &self,
        text: &str,
        pipeline: Option<&str>,
        selectors: &BackendSelectors,
    ) -> Result<SyncResult, ServiceError> {
        let original = validate(text)?;
        let output = self.executor.execute(original, pipeline, selectors).await;

        Ok(SyncResult {
            original: original.to_string(),
            note: change_note(original, &output.corrected).unwrap_or_default(),
            corrected: output.corrected,
            primary_output: output.primary_output,
            explanation: output.explanation,
            pipeline: output.pipeline,
        })
    }

    /// Correct an ordered list of paragraphs inline.
    pub async fn correct_batch<S: AsRef<str>>(
        &self,
        paragraphs: &[S],
        pipeline: Option<&str>,
        selectors: &BackendSelectors,
    ) -> Result<BatchOutput, ServiceError> {
        if paragraphs.iter().all(|p| p.as_ref().trim().is_empty()) {
            return Err(ServiceError::EmptyText);
        }
        Ok(self
            .batch
            .correct_paragraphs(paragraphs, pipeline, selectors)
            .await)
    }

    /// Split `text` on newlines and correct each paragraph inline.
    pub async fn correct_text_batch(
        &self,
        text: &str,
        pipeline: Option<&str>,
        selectors: &BackendSelectors,
    ) -> Result<BatchOutput, ServiceError> {
        let text = validate(text)?;
        Ok(self.batch.correct_text(text, pipeline, selectors).await)
    }

    pub async fn health(&self) -> HealthReport {
        let mut backends = Vec::new();
        for (kind, backend) in self.executor.backends().iter() {
            let corrector = &backend.corrector;
            backends.push(BackendHealth {
                kind,
                name: corrector.name().to_string(),
                available: backend.available,
                variants: if backend.available {
                    corrector.variants().await
                } else {
                    Vec::new()
                },
                default_variant: Corrector::default_variant(corrector).map(str::to_string),
            });
        }

        HealthReport {
            backends,
            pipelines: PipelineKind::names(),
            default_pipeline: self.executor.default_pipeline(),
            queue_size: self.queue.len(),
            queue_capacity: self.queue.capacity(),
        }
    }
}

fn validate(text: &str) -> Result<&str, ServiceError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::EmptyText);
    }
    Ok(trimmed)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
