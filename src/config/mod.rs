//! Configuration module for the Vietnamese text corrector.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each backend
//! and the job queue, `AppPaths` for the platform config directory, and TOML
//! persistence via `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, LocalLmConfig, PipelineConfig, QueueConfig, RemoteLmConfig, Seq2SeqConfig,
};
