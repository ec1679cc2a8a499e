//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.
//! Every section is `#[serde(default)]`, so a partial `settings.toml` only
//! overrides the keys it names.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// Pipeline selection and chunking budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pipeline used when a request names none, or names an unknown one.
    pub default_pipeline: String,
    /// Word budget per chunk for every backend that enforces one.
    pub max_words_per_chunk: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            default_pipeline: "qwen_protonx".into(),
            max_words_per_chunk: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// LocalLmConfig
// ---------------------------------------------------------------------------

/// Settings for the in-process (GPU-resident) causal language model.
///
/// The model is served by a local Ollama-compatible runtime; `models` maps
/// the short selector keys exposed to callers onto runtime model identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalLmConfig {
    /// Whether the local causal LM may be used at all.
    pub enabled: bool,
    /// Base URL of the local runtime (e.g. `http://localhost:11434`).
    pub base_url: String,
    /// Selector key → runtime model identifier.
    pub models: BTreeMap<String, String>,
    /// Key used when a request names no variant or an unknown one.
    pub default_model: String,
    /// Upper bound on generated tokens.
    pub max_new_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling cut-off.
    pub top_p: f32,
    /// Penalty applied to repeated tokens.
    pub repetition_penalty: f32,
    /// Seconds to wait for a load or generation call.
    pub timeout_secs: u64,
}

impl Default for LocalLmConfig {
    fn default() -> Self {
        let mut models = BTreeMap::new();
        models.insert("qwen2.5-7b".to_string(), "qwen2.5:7b".to_string());
        models.insert("qwen3-8b".to_string(), "qwen3:8b".to_string());
        Self {
            enabled: true,
            base_url: "http://localhost:11434".into(),
            models,
            default_model: "qwen2.5-7b".into(),
            max_new_tokens: 1024,
            temperature: 0.1,
            top_p: 0.9,
            repetition_penalty: 1.2,
            timeout_secs: 300,
        }
    }
}

// ---------------------------------------------------------------------------
// RemoteLmConfig
// ---------------------------------------------------------------------------

/// Settings for the remote causal LM reached over an Ollama-style chat API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteLmConfig {
    /// Base URL of the remote service.  Empty means "not configured", which
    /// marks the backend unavailable at startup.
    pub base_url: String,
    /// Bearer token — `None` for services that need no authentication.
    pub api_key: Option<String>,
    /// Model name used when a request names none.
    pub default_model: String,
    /// Upper bound on generated tokens (`num_predict`).
    pub max_new_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Maximum seconds to wait for a chat response.
    pub timeout_secs: u64,
}

impl Default for RemoteLmConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: None,
            default_model: "qwen2.5:7b".into(),
            max_new_tokens: 1024,
            temperature: 0.1,
            timeout_secs: 120,
        }
    }
}

// ---------------------------------------------------------------------------
// Seq2SeqConfig
// ---------------------------------------------------------------------------

/// Settings for a text-to-text (encoder/decoder) model served over HTTP.
///
/// Used twice: once for the dedicated spelling-correction model and once
/// for the refinement model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Seq2SeqConfig {
    /// Whether this backend may be used.
    pub enabled: bool,
    /// Base URL of the inference server exposing `POST /generate`.
    pub base_url: String,
    /// Model identifier, informational and sent with each request.
    pub model: String,
    /// Upper bound on generated tokens.
    pub max_new_tokens: u32,
    /// Beam width for decoding.
    pub num_beams: u32,
    /// Maximum seconds to wait for a response.
    pub timeout_secs: u64,
}

impl Seq2SeqConfig {
    /// Defaults for the spelling-correction model.
    pub fn sequence_default() -> Self {
        Self {
            enabled: true,
            base_url: "http://localhost:8081".into(),
            model: "bmd1905/vietnamese-correction-v2".into(),
            max_new_tokens: 512,
            num_beams: 4,
            timeout_secs: 120,
        }
    }

    /// Defaults for the refinement model.
    pub fn refiner_default() -> Self {
        Self {
            enabled: true,
            base_url: "http://localhost:8082".into(),
            model: "protonx-models/protonx-legal-tc".into(),
            max_new_tokens: 256,
            num_beams: 4,
            timeout_secs: 120,
        }
    }
}

impl Default for Seq2SeqConfig {
    fn default() -> Self {
        Self::sequence_default()
    }
}

// ---------------------------------------------------------------------------
// QueueConfig
// ---------------------------------------------------------------------------

/// Job queue and ledger settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of jobs waiting in the queue.
    pub max_queue_size: usize,
    /// A job running longer than this is marked failed.
    pub job_timeout_secs: u64,
    /// Terminal jobs older than this are swept from the ledger.
    pub job_retention_secs: u64,
    /// How long the worker waits on an empty queue before re-checking for
    /// shutdown and running a sweep.
    pub poll_interval_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 50,
            job_timeout_secs: 300,
            job_retention_secs: 3600,
            poll_interval_ms: 500,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// ```rust,no_run
/// use viet_corrector::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
/// assert!(config.pipeline.max_words_per_chunk > 0);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Pipeline defaults.
    pub pipeline: PipelineConfig,
    /// Local causal LM.
    pub local_lm: LocalLmConfig,
    /// Remote causal LM.
    pub remote_lm: RemoteLmConfig,
    /// Dedicated spelling-correction sequence model.
    pub sequence_model: Seq2SeqConfig,
    /// Refinement model.
    pub refiner: Seq2SeqConfig,
    /// Job queue.
    pub queue: QueueConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            local_lm: LocalLmConfig::default(),
            remote_lm: RemoteLmConfig::default(),
            sequence_model: Seq2SeqConfig::sequence_default(),
            refiner: Seq2SeqConfig::refiner_default(),
            queue: QueueConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
