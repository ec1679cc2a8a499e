//! Core [`Corrector`] trait shared by every correction backend.
//!
//! A backend turns text into a [`Correction`]: the corrected text plus a
//! (possibly empty) explanation.  The three model families (the dedicated
//! sequence model, the local causal LM and the remote causal LM) all
//! implement it, and so does the refinement model, so the pipeline executor
//! composes them without knowing which model sits behind each one.

use async_trait::async_trait;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CorrectionError
// ---------------------------------------------------------------------------

/// Errors that can occur while a backend produces a correction.
#[derive(Debug, Error)]
pub enum CorrectionError {
    /// HTTP transport or connection error.
    #[error("HTTP request failed: {0}")]
    Request(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out")]
    Timeout,

    /// The response body could not be decoded.
    #[error("failed to parse model response: {0}")]
    Parse(String),

    /// The model returned no usable text.
    #[error("model returned an empty response")]
    EmptyResponse,

    /// A model variant could not be made resident.
    #[error("failed to load model '{model}': {reason}")]
    ModelLoad { model: String, reason: String },
}

impl From<reqwest::Error> for CorrectionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            CorrectionError::Timeout
        } else {
            CorrectionError::Request(e.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// Correction
// ---------------------------------------------------------------------------

/// Output of one backend call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Correction {
    /// Corrected text.
    pub text: String,
    /// Human-readable summary of the changes; empty when the backend gives
    /// none.
    pub explanation: String,
}

impl Correction {
    pub fn new(text: impl Into<String>, explanation: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            explanation: explanation.into(),
        }
    }

    /// The input returned untouched, with an explanation of why.
    pub fn unchanged(text: &str, explanation: impl Into<String>) -> Self {
        Self::new(text, explanation)
    }
}

// ---------------------------------------------------------------------------
// Corrector trait
// ---------------------------------------------------------------------------

/// Async, object-safe interface for correction backends.
///
/// Implementors must be `Send + Sync` so they can be shared as
/// `Arc<dyn Corrector>` between request handlers and the job worker.
///
/// # Arguments
/// * `text`    – text to correct (already chunked by the caller).
/// * `variant` – optional backend-specific model selector; backends without
///               variants ignore it.
#[async_trait]
pub trait Corrector: Send + Sync {
    /// Display name used in logs and fallback notices.
    fn name(&self) -> &str;

    async fn correct(&self, text: &str, variant: Option<&str>)
        -> Result<Correction, CorrectionError>;

    /// Startup reachability check.  Backends without an external dependency
    /// worth probing report `true`.
    async fn probe(&self) -> bool {
        true
    }

    /// Selectable model variants, for capability introspection.
    async fn variants(&self) -> Vec<String> {
        Vec::new()
    }

    /// Variant used when a request names none.
    fn default_variant(&self) -> Option<&str> {
        None
    }
}

/// Shorten `text` for log output.
pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
