//! Correction backends for Vietnamese text.
//!
//! This module provides:
//! * [`Corrector`] — async trait implemented by every backend.
//! * [`Seq2SeqCorrector`] — text-to-text model over HTTP (spelling model and
//!   refiner).
//! * [`LocalLmCorrector`] — local causal LM with a single resident variant.
//! * [`RemoteLmCorrector`] — remote causal LM over an Ollama-style chat API.
//! * [`FallbackCorrector`] — wraps any corrector; keeps the input on failure.
//! * [`PromptBuilder`] — builds the tagged correction prompt.
//! * [`parse_generation`] — extracts corrected text and explanation from raw
//!   model output.
//! * [`CorrectionError`] — error variants for backend calls.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use viet_corrector::config::AppConfig;
//! use viet_corrector::llm::{FallbackCorrector, LocalLmCorrector};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!
//!     // A corrector that never fails (keeps the input instead).
//!     let corrector = FallbackCorrector::new(Arc::new(LocalLmCorrector::from_config(&config.local_lm)));
//!
//!     let out = corrector.correct_or_keep("hom nay troi dep", Some("qwen3-8b")).await;
//!     println!("{}\n{}", out.text, out.explanation);
//! }
//! ```

pub mod corrector;
pub mod fallback;
pub mod local;
pub mod parser;
pub mod prompt;
pub mod remote;
pub mod runtime;
pub mod sequence;
pub mod slot;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use corrector::{Correction, CorrectionError, Corrector};
pub use fallback::FallbackCorrector;
pub use local::LocalLmCorrector;
pub use parser::{parse_generation, ParseSource, ParsedGeneration};
pub use prompt::{PromptBuilder, CORRECTED_TAG, EXPLANATION_TAG, LEGACY_MARKER};
pub use remote::RemoteLmCorrector;
pub use runtime::{GenerationParams, ModelLoader, OllamaRuntime, TextGenerator};
pub use sequence::Seq2SeqCorrector;
pub use slot::ModelSlot;
