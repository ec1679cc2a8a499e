//! Pipeline executor: runs a named strategy over one text.
//!
//! A run has at most two stages.  The primary stage chunks the input and
//! corrects each chunk with the primary backend (or its fallback); the
//! refinement stage, when the strategy has one, chunks the whole primary
//! output again and runs it through the refiner.  Chunk outputs are joined
//! back in order with single spaces.

use serde::Serialize;

use crate::llm::corrector::preview;
use crate::pipeline::backends::{BackendKind, BackendSelectors, BackendSet};
use crate::pipeline::strategy::PipelineKind;
use crate::text::{chunk_text, explain, join_chunks};

/// Result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineOutput {
    /// Final corrected text.
    pub corrected: String,
    /// Fallback notices followed by the primary stage's explanation.
    pub explanation: String,
    /// Text after the primary stage, before refinement.
    pub primary_output: String,
    /// Strategy actually run, after coercion of unknown names.
    pub pipeline: PipelineKind,
}

/// Output of a single stage.
struct StageOutput {
    text: String,
    explanation: String,
    notices: Vec<String>,
}

/// Composes backends into the strategies named by [`PipelineKind`].
#[derive(Clone)]
pub struct PipelineExecutor {
    backends: BackendSet,
    max_words: usize,
    default_pipeline: PipelineKind,
}

impl PipelineExecutor {
    pub fn new(backends: BackendSet, max_words: usize, default_pipeline: PipelineKind) -> Self {
        Self {
            backends,
            max_words,
            default_pipeline,
        }
    }

    pub fn backends(&self) -> &BackendSet {
        &self.backends
    }

    pub fn default_pipeline(&self) -> PipelineKind {
        self.default_pipeline
    }

    /// Run `pipeline` (or the default) over `text`.
    ///
    /// Never fails: unavailable backends are substituted or skipped and
    /// failing chunks keep their input, each case annotated in the
    /// explanation.
    pub async fn execute(
        &self,
        text: &str,
        pipeline: Option<&str>,
        selectors: &BackendSelectors,
    ) -> PipelineOutput {
        let kind = PipelineKind::parse_or(pipeline, self.default_pipeline);
        log::info!(
            "pipeline: running {kind} on {} chars: {}",
            text.len(),
            preview(text, 60)
        );

        let primary = self.run_stage(kind.primary(), text, selectors).await;
        let mut notices = primary.notices;

        let corrected = if kind.refines() {
            let refined = self
                .run_stage(BackendKind::Refiner, &primary.text, selectors)
                .await;
            notices.extend(refined.notices);
            refined.text
        } else {
            primary.text.clone()
        };

        let explanation = notices
            .into_iter()
            .chain(std::iter::once(primary.explanation))
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        log::info!("pipeline: {kind} done ({} chars out)", corrected.len());
        PipelineOutput {
            corrected,
            explanation,
            primary_output: primary.text,
            pipeline: kind,
        }
    }

    async fn run_stage(
        &self,
        kind: BackendKind,
        text: &str,
        selectors: &BackendSelectors,
    ) -> StageOutput {
        let resolved = self.backends.resolve(kind);
        let Some((resolved_kind, corrector)) = resolved.backend else {
            return StageOutput {
                text: text.trim().to_string(),
                explanation: String::new(),
                notices: resolved.notices,
            };
        };

        if text.trim().is_empty() {
            return StageOutput {
                text: String::new(),
                explanation: String::new(),
                notices: resolved.notices,
            };
        }

        let variant = selectors.for_kind(resolved_kind);
        let chunks = chunk_text(text, self.max_words);
        log::debug!(
            "pipeline: {resolved_kind} stage over {} chunk(s)",
            chunks.len()
        );

        let mut outputs = Vec::with_capacity(chunks.len());
        let mut explanations = Vec::new();
        for chunk in &chunks {
            let correction = corrector.correct_or_keep(chunk, variant).await;
            if !correction.explanation.trim().is_empty() {
                explanations.push(correction.explanation.trim().to_string());
            }
            outputs.push(correction.text);
        }

        let corrected = join_chunks(&outputs);
        let explanation = if explanations.is_empty() {
            explain(text, &corrected)
        } else {
            explanations.join("\n")
        };

        StageOutput {
            text: corrected,
            explanation,
            notices: resolved.notices,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
