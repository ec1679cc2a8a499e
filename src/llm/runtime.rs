//! Model-runtime seam for the local causal LM.
//!
//! [`ModelLoader`] makes a model variant resident and hands back a
//! [`TextGenerator`] bound to it; [`ModelLoader::unload`] evicts it again.
//! [`OllamaRuntime`] implements both against a local Ollama server, where
//! "loading" pins the model in (GPU) memory via `keep_alive`.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::LocalLmConfig;
use crate::llm::corrector::CorrectionError;

// ---------------------------------------------------------------------------
// GenerationParams
// ---------------------------------------------------------------------------

/// Sampling parameters for one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub repetition_penalty: f32,
}

impl GenerationParams {
    pub fn from_config(config: &LocalLmConfig) -> Self {
        Self {
            max_new_tokens: config.max_new_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            repetition_penalty: config.repetition_penalty,
        }
    }
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self::from_config(&LocalLmConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// A resident model that turns a prompt into a raw generation string.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, CorrectionError>;
}

/// Loads and evicts model variants by runtime identifier.
#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, identifier: &str) -> Result<Box<dyn TextGenerator>, CorrectionError>;

    /// Release the resources held for `identifier`.  Failures are logged,
    /// never returned: a failed eviction must not block loading the next
    /// variant.
    async fn unload(&self, identifier: &str);
}

// ---------------------------------------------------------------------------
// OllamaRuntime
// ---------------------------------------------------------------------------

const KEEP_ALIVE: &str = "30m";

/// [`ModelLoader`] backed by a local Ollama server.
#[derive(Clone)]
pub struct OllamaRuntime {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaRuntime {
    pub fn from_config(config: &LocalLmConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    /// `true` when the server answers `GET /api/tags`.
    pub async fn probe(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                log::warn!("local-lm: runtime at {} unreachable: {e}", self.base_url);
                false
            }
        }
    }

    async fn post_generate(&self, body: serde_json::Value) -> Result<serde_json::Value, CorrectionError> {
        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        response
            .json()
            .await
            .map_err(|e| CorrectionError::Parse(e.to_string()))
    }
}

#[async_trait]
impl ModelLoader for OllamaRuntime {
    async fn load(&self, identifier: &str) -> Result<Box<dyn TextGenerator>, CorrectionError> {
        // A generate request without a prompt only loads the model.
        let body = serde_json::json!({
            "model": identifier,
            "keep_alive": KEEP_ALIVE,
        });
        self.post_generate(body)
            .await
            .map_err(|e| CorrectionError::ModelLoad {
                model: identifier.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Box::new(OllamaGenerator {
            runtime: self.clone(),
            model: identifier.to_string(),
        }))
    }

    async fn unload(&self, identifier: &str) {
        let body = serde_json::json!({
            "model": identifier,
            "keep_alive": 0,
        });
        if let Err(e) = self.post_generate(body).await {
            log::warn!("local-lm: failed to unload '{identifier}': {e}");
        }
    }
}

/// Generator bound to one model resident in an Ollama server.
struct OllamaGenerator {
    runtime: OllamaRuntime,
    model: String,
}

#[async_trait]
impl TextGenerator for OllamaGenerator {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, CorrectionError> {
        let body = serde_json::json!({
            "model":      self.model,
            "prompt":     prompt,
            "raw":        true,
            "stream":     false,
            "keep_alive": KEEP_ALIVE,
            "options": {
                "temperature":    params.temperature,
                "top_p":          params.top_p,
                "num_predict":    params.max_new_tokens,
                "repeat_penalty": params.repetition_penalty
            }
        });

        let json = self.runtime.post_generate(body).await?;
        let text = json["response"]
            .as_str()
            .ok_or(CorrectionError::EmptyResponse)?;

        if text.trim().is_empty() {
            return Err(CorrectionError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
