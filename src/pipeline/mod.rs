//! Pipeline orchestration.
//!
//! # Architecture
//!
//! ```text
//! text ──▶ PipelineExecutor::execute(pipeline, selectors)
//!            │
//!            ├─ BackendSet::resolve(primary)     → backend or fallback (+ notice)
//!            ├─ chunk_text → correct each chunk → join_chunks        [primary]
//!            └─ (refining strategies)
//!                 BackendSet::resolve(Refiner)
//!                 chunk_text → refine each chunk → join_chunks       [refine]
//!
//! BatchCoordinator ── per paragraph ──▶ PipelineExecutor
//! ```
//!
//! # Quick start
//!
//! ```rust,no_run
//! use viet_corrector::config::AppConfig;
//! use viet_corrector::pipeline::{BackendSelectors, BackendSet, PipelineExecutor, PipelineKind};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let backends = BackendSet::from_config(&config).await;
//!     let executor = PipelineExecutor::new(
//!         backends,
//!         config.pipeline.max_words_per_chunk,
//!         PipelineKind::LocalLmRefine,
//!     );
//!
//!     let out = executor
//!         .execute("hom qua em di chua Huong", Some("bartpho_protonx"), &BackendSelectors::default())
//!         .await;
//!     println!("{}", out.corrected);
//! }
//! ```

pub mod backends;
pub mod batch;
pub mod executor;
pub mod strategy;

pub use backends::{Backend, BackendKind, BackendSelectors, BackendSet, Resolved};
pub use batch::{split_paragraphs, BatchCoordinator, BatchOutput, ParagraphResult, PARAGRAPH_SEPARATOR};
pub use executor::{PipelineExecutor, PipelineOutput};
pub use strategy::{PipelineKind, UnknownPipeline};
