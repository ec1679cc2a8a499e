//! Remote causal-LM corrector over an Ollama-style HTTP API.
//!
//! * `POST /api/chat` — one non-streaming chat completion per call.
//! * `GET /api/tags`  — model catalogue and health probe.
//!
//! Network failures are not errors from the caller's point of view: the
//! corrector returns the input unchanged with an explanation describing the
//! failure, so a flaky remote never aborts a pipeline.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::config::RemoteLmConfig;
use crate::llm::corrector::{preview, Correction, CorrectionError, Corrector};
use crate::llm::parser::parse_generation;
use crate::llm::prompt::PromptBuilder;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);
const CATALOGUE_TIMEOUT: Duration = Duration::from_secs(10);

/// Calls a remote Ollama-compatible service for correction.
///
/// All connection details come from [`RemoteLmConfig`]; nothing is
/// hardcoded.
pub struct RemoteLmCorrector {
    client: reqwest::Client,
    config: RemoteLmConfig,
    prompt_builder: PromptBuilder,
    /// Last successfully fetched catalogue.
    cached_models: Mutex<Option<Vec<String>>>,
}

impl RemoteLmCorrector {
    /// Build a corrector whose HTTP client enforces `config.timeout_secs`.
    pub fn from_config(config: &RemoteLmConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            config: config.clone(),
            prompt_builder: PromptBuilder::new(),
            cached_models: Mutex::new(None),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.config.base_url.trim_end_matches('/'))
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.api_key.as_deref() {
            Some(key) if !key.is_empty() => req.bearer_auth(key),
            _ => req,
        }
    }

    /// Fetch the model catalogue, caching it.  On failure the previous
    /// catalogue (or an empty list) is returned.
    pub async fn fetch_models(&self) -> Vec<String> {
        match self.request_models().await {
            Ok(models) => {
                log::info!("remote-lm: fetched {} models", models.len());
                *self.cache() = Some(models.clone());
                models
            }
            Err(e) => {
                log::warn!("remote-lm: cannot fetch models: {e}");
                self.cache().clone().unwrap_or_default()
            }
        }
    }

    /// Cached catalogue, fetching it on first use.
    pub async fn available_models(&self) -> Vec<String> {
        let cached = self.cache().clone();
        match cached {
            Some(models) => models,
            None => self.fetch_models().await,
        }
    }

    fn cache(&self) -> std::sync::MutexGuard<'_, Option<Vec<String>>> {
        self.cached_models
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn request_models(&self) -> Result<Vec<String>, CorrectionError> {
        let req = self
            .client
            .get(self.url("/api/tags"))
            .timeout(CATALOGUE_TIMEOUT);
        let json: serde_json::Value = self
            .authorize(req)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| CorrectionError::Parse(e.to_string()))?;

        Ok(json["models"]
            .as_array()
            .map(|models| {
                models
                    .iter()
                    .filter_map(|m| m["name"].as_str())
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn chat(&self, model: &str, text: &str) -> Result<String, CorrectionError> {
        let (system_msg, user_msg) = self.prompt_builder.build_chat(text);

        let body = serde_json::json!({
            "model": model,
            "messages": [
                { "role": "system", "content": system_msg },
                { "role": "user",   "content": user_msg   }
            ],
            "stream": false,
            "options": {
                "temperature": self.config.temperature,
                "num_predict": self.config.max_new_tokens
            }
        });

        let req = self.client.post(self.url("/api/chat")).json(&body);
        let json: serde_json::Value = self
            .authorize(req)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| CorrectionError::Parse(e.to_string()))?;

        let content = json["message"]["content"].as_str().unwrap_or_default();
        if content.trim().is_empty() {
            return Err(CorrectionError::EmptyResponse);
        }
        Ok(content.to_string())
    }
}

#[async_trait]
impl Corrector for RemoteLmCorrector {
    fn name(&self) -> &str {
        "Ollama"
    }

    /// Never returns `Err(_)`: failures yield the input text plus an
    /// explanation of what went wrong.
    async fn correct(
        &self,
        text: &str,
        variant: Option<&str>,
    ) -> Result<Correction, CorrectionError> {
        let model = variant
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(self.config.default_model.as_str());
        log::debug!("remote-lm [{model}] input: {}", preview(text, 200));

        let raw = match self.chat(model, text).await {
            Ok(raw) => raw,
            Err(CorrectionError::EmptyResponse) => {
                log::warn!("remote-lm [{model}]: empty response");
                return Ok(Correction::unchanged(
                    text,
                    "Không nhận được phản hồi từ Ollama API",
                ));
            }
            Err(e) => {
                log::warn!("remote-lm [{model}]: {e}");
                return Ok(Correction::unchanged(
                    text,
                    format!("Lỗi kết nối Ollama API: {e}"),
                ));
            }
        };

        let parsed = parse_generation(&raw, text);
        log::debug!(
            "remote-lm [{model}] output ({:?}): {}",
            parsed.source,
            preview(&parsed.corrected, 100)
        );
        Ok(parsed.into())
    }

    /// Unconfigured or unreachable services are unavailable.
    async fn probe(&self) -> bool {
        if self.config.base_url.trim().is_empty() {
            log::info!("remote-lm: no base URL configured");
            return false;
        }
        let req = self.client.get(self.url("/api/tags")).timeout(PROBE_TIMEOUT);
        match self.authorize(req).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                log::warn!("remote-lm: health check failed: {e}");
                false
            }
        }
    }

    async fn variants(&self) -> Vec<String> {
        self.available_models().await
    }

    fn default_variant(&self) -> Option<&str> {
        Some(&self.config.default_model)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(base_url: &str) -> RemoteLmConfig {
        RemoteLmConfig {
            base_url: base_url.to_string(),
            timeout_secs: 5,
            ..RemoteLmConfig::default()
        }
    }

    fn chat_reply(content: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": { "role": "assistant", "content": content },
            "done": true
        }))
    }

    #[tokio::test]
    async fn correct_parses_chat_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(serde_json::json!({ "model": "qwen2.5:7b", "stream": false })))
            .respond_with(chat_reply(
                "[VĂN BẢN ĐÃ SỬA]\nHôm qua em đi chùa Hương.\n[GIẢI THÍCH]\nThêm dấu.",
            ))
            .mount(&server)
            .await;

        let corrector = RemoteLmCorrector::from_config(&config_for(&server.uri()));
        let out = corrector
            .correct("hom qua em di chua Huong", None)
            .await
            .expect("never errors");
        assert_eq!(out.text, "Hôm qua em đi chùa Hương.");
        assert_eq!(out.explanation, "Thêm dấu.");
    }

    #[tokio::test]
    async fn variant_selects_model_and_key_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({ "model": "llama3:8b" })))
            .respond_with(chat_reply("[VĂN BẢN ĐÃ SỬA] Được."))
            .mount(&server)
            .await;

        let mut config = config_for(&server.uri());
        config.api_key = Some("sk-test".into());
        let corrector = RemoteLmCorrector::from_config(&config);
        let out = corrector.correct("duoc", Some("llama3:8b")).await.unwrap();
        assert_eq!(out.text, "Được.");
    }

    #[tokio::test]
    async fn network_failure_returns_original_text() {
        let corrector = RemoteLmCorrector::from_config(&config_for("http://127.0.0.1:9"));
        let out = corrector
            .correct("toi di hoc", None)
            .await
            .expect("network failure is not an error");
        assert_eq!(out.text, "toi di hoc");
        assert!(out.explanation.starts_with("Lỗi kết nối Ollama API"));
    }

    #[tokio::test]
    async fn server_error_returns_original_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let corrector = RemoteLmCorrector::from_config(&config_for(&server.uri()));
        let out = corrector.correct("toi di hoc", None).await.unwrap();
        assert_eq!(out.text, "toi di hoc");
        assert!(out.explanation.contains("Lỗi kết nối"));
    }

    #[tokio::test]
    async fn empty_reply_returns_original_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(chat_reply("   "))
            .mount(&server)
            .await;

        let corrector = RemoteLmCorrector::from_config(&config_for(&server.uri()));
        let out = corrector.correct("toi di hoc", None).await.unwrap();
        assert_eq!(out, Correction::unchanged("toi di hoc", "Không nhận được phản hồi từ Ollama API"));
    }

    #[tokio::test]
    async fn timeout_behaves_like_network_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(chat_reply("[VĂN BẢN ĐÃ SỬA] muộn").set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let mut config = config_for(&server.uri());
        config.timeout_secs = 1;
        let corrector = RemoteLmCorrector::from_config(&config);
        let out = corrector.correct("toi di hoc", None).await.unwrap();
        assert_eq!(out.text, "toi di hoc");
        assert!(out.explanation.contains("timed out"));
    }

    #[tokio::test]
    async fn catalogue_is_cached_after_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "models": [ { "name": "qwen2.5:7b" }, { "name": "" }, { "name": "gemma2:9b" } ]
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        let corrector = RemoteLmCorrector::from_config(&config_for(&server.uri()));
        assert_eq!(corrector.fetch_models().await, vec!["qwen2.5:7b", "gemma2:9b"]);
        // Second fetch hits no mock (404) and falls back to the cache.
        assert_eq!(corrector.fetch_models().await, vec!["qwen2.5:7b", "gemma2:9b"]);
        assert_eq!(corrector.variants().await, vec!["qwen2.5:7b", "gemma2:9b"]);
    }

    #[tokio::test]
    async fn probe_requires_base_url_and_reachability() {
        let unconfigured = RemoteLmCorrector::from_config(&RemoteLmConfig::default());
        assert!(!unconfigured.probe().await);

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "models": [] })))
            .mount(&server)
            .await;
        let reachable = RemoteLmCorrector::from_config(&config_for(&server.uri()));
        assert!(reachable.probe().await);
        assert_eq!(reachable.default_variant(), Some("qwen2.5:7b"));
    }
}
