use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::{BackendSelectors, PipelineOutput};
use crate::text::change_note;

/// Lifecycle status of a job.
///
/// Transitions only run forward: pending → processing → completed | failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// What a caller asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionRequest {
    pub text: String,
    /// Pipeline name; `None` or unknown means the configured default.
    pub pipeline: Option<String>,
    #[serde(default)]
    pub selectors: BackendSelectors,
}

/// Outcome attached to a completed job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub corrected: String,
    pub explanation: String,
    pub primary_output: String,
    /// Change report; `None` when nothing changed.
    pub note: Option<String>,
    pub changed: bool,
}

impl JobResult {
    pub fn from_output(original: &str, output: PipelineOutput) -> Self {
        Self {
            note: change_note(original, &output.corrected),
            changed: original.trim() != output.corrected.trim(),
            corrected: output.corrected,
            explanation: output.explanation,
            primary_output: output.primary_output,
        }
    }
}

/// One asynchronously queued unit of correction work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub request: CorrectionRequest,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<JobResult>,
    pub error: Option<String>,
}

impl Job {
    pub fn new(request: CorrectionRequest) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            request,
            status: JobStatus::Pending,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            result: None,
            error: None,
        }
    }

    /// pending → processing.  Returns `false` (and changes nothing) from any
    /// other state.
    pub fn start(&mut self) -> bool {
        if self.status != JobStatus::Pending {
            return false;
        }
        self.status = JobStatus::Processing;
        self.started_at = Some(Utc::now());
        true
    }

    /// processing → completed.
    pub fn complete(&mut self, result: JobResult) -> bool {
        if self.status != JobStatus::Processing {
            return false;
        }
        self.status = JobStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.result = Some(result);
        true
    }

    /// processing → failed.
    pub fn fail(&mut self, error: impl Into<String>) -> bool {
        if self.status != JobStatus::Processing {
            return false;
        }
        self.status = JobStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.error = Some(error.into());
        true
    }

    /// Time the job became terminal, if it has.
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at.filter(|_| self.status.is_terminal())
    }
}

/// Poll view of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSnapshot {
    pub id: String,
    pub status: JobStatus,
    /// 1-based position while pending.
    pub queue_position: Option<usize>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub result: Option<JobResult>,
    pub error: Option<String>,
}

impl JobSnapshot {
    pub fn of(job: &Job, queue_position: Option<usize>) -> Self {
        Self {
            id: job.id.clone(),
            status: job.status,
            queue_position,
            created_at: job.created_at,
            started_at: job.started_at,
            completed_at: job.completed_at,
            result: job.result.clone(),
            error: job.error.clone(),
        }
    }
}
