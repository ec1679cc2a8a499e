//! Fallback corrector: wraps any [`Corrector`] and keeps the input on error.
//!
//! When the wrapped backend fails for any reason (`Request`, `Timeout`,
//! `Parse`, `EmptyResponse`, `ModelLoad`) [`FallbackCorrector`] returns the
//! input text unchanged, annotated with the failure, instead of propagating
//! the error.  A failing chunk therefore never aborts the rest of a
//! pipeline run.

use std::sync::Arc;

use async_trait::async_trait;

use crate::llm::corrector::{Correction, CorrectionError, Corrector};

// ---------------------------------------------------------------------------
// FallbackCorrector
// ---------------------------------------------------------------------------

/// A transparent wrapper around any [`Corrector`] that never returns an
/// error.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use viet_corrector::config::Seq2SeqConfig;
/// use viet_corrector::llm::{FallbackCorrector, Seq2SeqCorrector};
///
/// let inner = Seq2SeqCorrector::from_config("BartPho", &Seq2SeqConfig::sequence_default());
/// let corrector = FallbackCorrector::new(Arc::new(inner));
/// assert_eq!(corrector.name(), "BartPho");
/// ```
#[derive(Clone)]
pub struct FallbackCorrector {
    inner: Arc<dyn Corrector>,
}

impl FallbackCorrector {
    /// Wrap `inner` with fallback behaviour.
    pub fn new(inner: Arc<dyn Corrector>) -> Self {
        Self { inner }
    }

    /// Return a reference to the wrapped corrector.
    pub fn inner(&self) -> &Arc<dyn Corrector> {
        &self.inner
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Correct `text`, or return it unchanged with a failure note.
    pub async fn correct_or_keep(&self, text: &str, variant: Option<&str>) -> Correction {
        match self.inner.correct(text, variant).await {
            Ok(correction) => correction,
            Err(err) => {
                log::warn!(
                    "{} correction failed, keeping input (len={}): {err}",
                    self.inner.name(),
                    text.len()
                );
                Correction::unchanged(
                    text,
                    format!("⚠️ {} lỗi: {err}. Giữ nguyên văn bản.", self.inner.name()),
                )
            }
        }
    }
}

#[async_trait]
impl Corrector for FallbackCorrector {
    fn name(&self) -> &str {
        self.inner.name()
    }

    /// This implementation **never** returns `Err(_)`.
    async fn correct(
        &self,
        text: &str,
        variant: Option<&str>,
    ) -> Result<Correction, CorrectionError> {
        Ok(self.correct_or_keep(text, variant).await)
    }

    async fn probe(&self) -> bool {
        self.inner.probe().await
    }

    async fn variants(&self) -> Vec<String> {
        self.inner.variants().await
    }

    fn default_variant(&self) -> Option<&str> {
        self.inner.default_variant()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
