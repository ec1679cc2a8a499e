//! Local causal-LM corrector.
//!
//! The model lives on a single GPU and serves one generation at a time.
//! [`LocalLmCorrector`] owns the [`ModelSlot`] behind an async mutex that is
//! held for variant swaps and generation only; prompt building and output
//! parsing happen outside it.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::config::LocalLmConfig;
use crate::llm::corrector::{preview, Correction, CorrectionError, Corrector};
use crate::llm::parser::parse_generation;
use crate::llm::prompt::{PromptBuilder, CORRECTED_TAG, LEGACY_MARKER};
use crate::llm::runtime::{GenerationParams, ModelLoader, OllamaRuntime};
use crate::llm::slot::ModelSlot;

/// Corrector backed by an in-process causal LM with selectable variants.
pub struct LocalLmCorrector {
    slot: tokio::sync::Mutex<ModelSlot>,
    /// Key of the resident variant, readable without waiting for the model
    /// lock.
    resident_key: Mutex<Option<String>>,
    models: BTreeMap<String, String>,
    default_key: String,
    params: GenerationParams,
    prompt_builder: PromptBuilder,
    runtime: Option<OllamaRuntime>,
}

impl LocalLmCorrector {
    /// Build a corrector that talks to the Ollama runtime named in `config`.
    pub fn from_config(config: &LocalLmConfig) -> Self {
        let runtime = OllamaRuntime::from_config(config);
        let mut corrector = Self::with_loader(config, Arc::new(runtime.clone()));
        corrector.runtime = Some(runtime);
        corrector
    }

    /// Build a corrector over an arbitrary loader.
    pub fn with_loader(config: &LocalLmConfig, loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            slot: tokio::sync::Mutex::new(ModelSlot::new(loader)),
            resident_key: Mutex::new(None),
            models: config.models.clone(),
            default_key: config.default_model.clone(),
            params: GenerationParams::from_config(config),
            prompt_builder: PromptBuilder::new(),
            runtime: None,
        }
    }

    /// Map a selector to `(key, runtime identifier)`.
    ///
    /// Unknown keys fall back to the default key with a warning.
    pub fn resolve_variant(&self, variant: Option<&str>) -> (String, String) {
        let key = match variant {
            Some(key) if self.models.contains_key(key) => key,
            Some(key) => {
                log::warn!(
                    "local-lm: unknown model '{key}', using default '{}'",
                    self.default_key
                );
                self.default_key.as_str()
            }
            None => self.default_key.as_str(),
        };

        let identifier = self
            .models
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string());
        (key.to_string(), identifier)
    }

    /// Key of the currently resident variant.
    pub fn current_variant(&self) -> Option<String> {
        self.resident_key
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn generate(
        &self,
        key: &str,
        identifier: &str,
        prompt: &str,
    ) -> Result<String, CorrectionError> {
        let mut slot = self.slot.lock().await;
        let loaded = slot.ensure_loaded(identifier).await;

        // A failed load leaves the slot empty.
        *self
            .resident_key
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = loaded.is_ok().then(|| key.to_string());

        loaded?.generate(prompt, &self.params).await
    }
}

/// The runtime returns only the continuation of the prompt, which ends with
/// an open corrected-text tag; put the tag back so the answer parses as a
/// tagged block.  Legacy-format answers are left alone.
fn after_open_cue(raw: &str) -> Cow<'_, str> {
    if raw.contains(LEGACY_MARKER) {
        Cow::Borrowed(raw)
    } else {
        Cow::Owned(format!("{CORRECTED_TAG}\n{raw}"))
    }
}

#[async_trait]
impl Corrector for LocalLmCorrector {
    fn name(&self) -> &str {
        "Qwen"
    }

    async fn correct(
        &self,
        text: &str,
        variant: Option<&str>,
    ) -> Result<Correction, CorrectionError> {
        let (key, identifier) = self.resolve_variant(variant);
        log::debug!("local-lm [{key}] input: {}", preview(text, 200));

        let prompt = self.prompt_builder.build(text);
        let raw = self.generate(&key, &identifier, &prompt).await?;

        let parsed = parse_generation(&after_open_cue(&raw), text);
        log::debug!(
            "local-lm [{key}] output ({:?}): {}",
            parsed.source,
            preview(&parsed.corrected, 100)
        );
        Ok(parsed.into())
    }

    async fn probe(&self) -> bool {
        match &self.runtime {
            Some(runtime) => runtime.probe().await,
            None => true,
        }
    }

    async fn variants(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    fn default_variant(&self) -> Option<&str> {
        Some(&self.default_key)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
