//! Text-to-text (encoder/decoder) correctors served over HTTP.
//!
//! Both the dedicated spelling-correction model and the refinement model
//! are plain seq2seq models behind an inference server exposing
//! `POST /generate`.  They produce corrected text only; the pipeline
//! executor derives an explanation from the word diff.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::Seq2SeqConfig;
use crate::llm::corrector::{preview, Correction, CorrectionError, Corrector};

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Corrector backed by a seq2seq inference server.
pub struct Seq2SeqCorrector {
    name: String,
    client: reqwest::Client,
    config: Seq2SeqConfig,
}

impl Seq2SeqCorrector {
    /// Build a corrector shown as `name` in logs and notices.
    pub fn from_config(name: impl Into<String>, config: &Seq2SeqConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            name: name.into(),
            client,
            config: config.clone(),
        }
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{endpoint}", self.config.base_url.trim_end_matches('/'))
    }
}

/// Inference servers answer either with one object or a one-element list.
fn generated_text(json: &serde_json::Value) -> Option<&str> {
    json["generated_text"]
        .as_str()
        .or_else(|| json[0]["generated_text"].as_str())
}

#[async_trait]
impl Corrector for Seq2SeqCorrector {
    fn name(&self) -> &str {
        &self.name
    }

    async fn correct(
        &self,
        text: &str,
        _variant: Option<&str>,
    ) -> Result<Correction, CorrectionError> {
        log::debug!("{}: input: {}", self.name, preview(text, 200));

        let body = serde_json::json!({
            "model":  self.config.model,
            "inputs": text,
            "parameters": {
                "max_new_tokens": self.config.max_new_tokens,
                "num_beams":      self.config.num_beams,
                "early_stopping": true
            }
        });

        let json: serde_json::Value = self
            .client
            .post(self.url("/generate"))
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| CorrectionError::Parse(e.to_string()))?;

        let corrected = generated_text(&json)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(CorrectionError::EmptyResponse)?;

        log::debug!("{}: output: {}", self.name, preview(corrected, 100));
        Ok(Correction::new(corrected, ""))
    }

    async fn probe(&self) -> bool {
        if !self.config.enabled {
            return false;
        }
        match self
            .client
            .get(self.url("/health"))
            .timeout(PROBE_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                log::warn!("{}: server at {} unreachable: {e}", self.name, self.config.base_url);
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn corrector_for(server: &MockServer) -> Seq2SeqCorrector {
        let config = Seq2SeqConfig {
            base_url: server.uri(),
            timeout_secs: 5,
            ..Seq2SeqConfig::sequence_default()
        };
        Seq2SeqCorrector::from_config("BartPho", &config)
    }

    #[tokio::test]
    async fn object_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .and(body_partial_json(serde_json::json!({
                "inputs": "toi di hoc",
                "parameters": { "num_beams": 4 }
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "generated_text": " Tôi đi học " })),
            )
            .mount(&server)
            .await;

        let out = corrector_for(&server).correct("toi di hoc", None).await.unwrap();
        assert_eq!(out, Correction::new("Tôi đi học", ""));
    }

    #[tokio::test]
    async fn list_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!([{ "generated_text": "Xin chào" }])),
            )
            .mount(&server)
            .await;

        let out = corrector_for(&server).correct("xin chao", None).await.unwrap();
        assert_eq!(out.text, "Xin chào");
    }

    #[tokio::test]
    async fn blank_output_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "generated_text": "" })))
            .mount(&server)
            .await;

        let err = corrector_for(&server).correct("x", None).await.unwrap_err();
        assert!(matches!(err, CorrectionError::EmptyResponse));
    }

    #[tokio::test]
    async fn server_error_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/generate"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = corrector_for(&server).correct("x", None).await.unwrap_err();
        assert!(matches!(err, CorrectionError::Request(_)));
    }

    #[tokio::test]
    async fn probe_honours_enabled_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        assert!(corrector_for(&server).probe().await);

        let disabled = Seq2SeqCorrector::from_config(
            "ProtonX",
            &Seq2SeqConfig {
                enabled: false,
                base_url: server.uri(),
                ..Seq2SeqConfig::refiner_default()
            },
        );
        assert!(!disabled.probe().await);
        assert_eq!(disabled.name(), "ProtonX");
    }
}
