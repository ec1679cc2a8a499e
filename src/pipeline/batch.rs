//! Paragraph batch coordinator.
//!
//! Runs a pipeline over each paragraph of a document in order and rejoins
//! the results.  Paragraphs that fail the meaningful-text gate (headings
//! made of numbers, stray punctuation) are passed through without touching
//! any backend.

use serde::Serialize;

use crate::pipeline::backends::BackendSelectors;
use crate::pipeline::executor::PipelineExecutor;
use crate::pipeline::strategy::PipelineKind;
use crate::text::{change_note, is_meaningful, DEFAULT_MIN_WORDS};

/// Separator between paragraphs in [`BatchOutput::full_text`].
pub const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Split `text` into trimmed, non-blank lines.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Result for one paragraph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParagraphResult {
    pub index: usize,
    pub original: String,
    /// Output of the primary stage.
    pub primary_output: String,
    pub corrected: String,
    pub explanation: String,
    /// Change report; `None` when the paragraph is unchanged.
    pub note: Option<String>,
    pub changed: bool,
    /// `false` when the meaningful-text gate skipped the paragraph.
    pub processed: bool,
}

/// Result for a whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchOutput {
    pub pipeline: PipelineKind,
    pub paragraphs: Vec<ParagraphResult>,
    /// Corrected paragraphs joined with [`PARAGRAPH_SEPARATOR`].
    pub full_text: String,
}

/// Fans a document out to the executor paragraph by paragraph.
#[derive(Clone)]
pub struct BatchCoordinator {
    executor: PipelineExecutor,
    min_words: usize,
}

impl BatchCoordinator {
    pub fn new(executor: PipelineExecutor) -> Self {
        Self {
            executor,
            min_words: DEFAULT_MIN_WORDS,
        }
    }

    /// Override the meaningful-text threshold.
    pub fn with_min_words(mut self, min_words: usize) -> Self {
        self.min_words = min_words;
        self
    }

    pub async fn correct_paragraphs<S: AsRef<str>>(
        &self,
        paragraphs: &[S],
        pipeline: Option<&str>,
        selectors: &BackendSelectors,
    ) -> BatchOutput {
        let kind = PipelineKind::parse_or(pipeline, self.executor.default_pipeline());
        let total = paragraphs.len();
        let mut results = Vec::with_capacity(total);

        for (index, paragraph) in paragraphs.iter().enumerate() {
            let original = paragraph.as_ref().trim();

            if !is_meaningful(original, self.min_words) {
                log::info!("batch: skipping paragraph {}/{total}: '{original}'", index + 1);
                results.push(ParagraphResult {
                    index,
                    original: original.to_string(),
                    primary_output: original.to_string(),
                    corrected: original.to_string(),
                    explanation: String::new(),
                    note: None,
                    changed: false,
                    processed: false,
                });
                continue;
            }

            log::info!("batch: paragraph {}/{total}", index + 1);
            let output = self
                .executor
                .execute(original, Some(kind.as_str()), selectors)
                .await;

            results.push(ParagraphResult {
                index,
                original: original.to_string(),
                note: change_note(original, &output.corrected),
                changed: original != output.corrected,
                primary_output: output.primary_output,
                corrected: output.corrected,
                explanation: output.explanation,
                processed: true,
            });
        }

        let full_text = results
            .iter()
            .map(|r| r.corrected.as_str())
            .collect::<Vec<_>>()
            .join(PARAGRAPH_SEPARATOR);

        BatchOutput {
            pipeline: kind,
            paragraphs: results,
            full_text,
        }
    }

    /// Split `text` into paragraphs, then correct them.
    pub async fn correct_text(
        &self,
        text: &str,
        pipeline: Option<&str>,
        selectors: &BackendSelectors,
    ) -> BatchOutput {
        let paragraphs = split_paragraphs(text);
        self.correct_paragraphs(paragraphs.as_slice(), pipeline, selectors)
            .await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{Correction, CorrectionError, Corrector};
    use crate::pipeline::backends::{BackendKind, BackendSet};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Upper-cases the first letter and counts calls.
    #[derive(Default)]
    struct Capitalise {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Corrector for Capitalise {
        fn name(&self) -> &str {
            "Qwen"
        }

        async fn correct(&self, text: &str, _v: Option<&str>) -> Result<Correction, CorrectionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut chars = text.chars();
            let out = match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            };
            Ok(Correction::new(out, "viết hoa"))
        }
    }

    fn coordinator() -> (BatchCoordinator, Arc<Capitalise>) {
        let local = Arc::new(Capitalise::default());
        let backends = BackendSet::new().with(BackendKind::LocalLm, local.clone(), true);
        let executor = PipelineExecutor::new(backends, 100, PipelineKind::LocalLmOnly);
        (BatchCoordinator::new(executor), local)
    }

    #[test]
    fn split_drops_blank_lines() {
        assert_eq!(
            split_paragraphs("  một hai ba \n\n   \nbốn năm sáu\r\n"),
            vec!["một hai ba", "bốn năm sáu"]
        );
        assert!(split_paragraphs("\n \n").is_empty());
    }

    #[tokio::test]
    async fn paragraphs_are_corrected_in_order_and_rejoined() {
        let (coordinator, _) = coordinator();
        let out = coordinator
            .correct_text(
                "hôm nay trời đẹp\nchúng tôi đi chơi",
                None,
                &BackendSelectors::default(),
            )
            .await;

        assert_eq!(out.paragraphs.len(), 2);
        assert_eq!(out.paragraphs[1].index, 1);
        assert_eq!(out.paragraphs[0].corrected, "Hôm nay trời đẹp");
        assert!(out.paragraphs[0].changed);
        assert!(out.paragraphs[0]
            .note
            .as_deref()
            .is_some_and(|n| n.contains("Thêm: Hôm")));
        assert_eq!(out.full_text, "Hôm nay trời đẹp\n\nChúng tôi đi chơi");
        assert_eq!(out.pipeline, PipelineKind::LocalLmOnly);
    }

    #[tokio::test]
    async fn trivial_paragraphs_bypass_backends() {
        let (coordinator, local) = coordinator();
        let out = coordinator
            .correct_paragraphs(
                &["1.", "---", "một hai ba bốn"],
                Some("qwen_only"),
                &BackendSelectors::default(),
            )
            .await;

        assert_eq!(local.calls.load(Ordering::SeqCst), 1);
        assert!(!out.paragraphs[0].processed);
        assert_eq!(out.paragraphs[0].corrected, "1.");
        assert_eq!(out.paragraphs[0].note, None);
        assert!(!out.paragraphs[1].changed);
        assert_eq!(out.full_text, "1.\n\n---\n\nMột hai ba bốn");
    }

    #[tokio::test]
    async fn unchanged_paragraph_has_no_note() {
        let (coordinator, _) = coordinator();
        let out = coordinator
            .correct_paragraphs(&["Đã đúng chính tả rồi"], None, &BackendSelectors::default())
            .await;
        assert!(!out.paragraphs[0].changed);
        assert_eq!(out.paragraphs[0].note, None);
    }
}
