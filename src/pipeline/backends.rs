//! Backend registry with startup availability and fallback resolution.
//!
//! Every backend is registered once, wrapped in a [`FallbackCorrector`] so a
//! transient failure keeps the input instead of aborting a pipeline.  An
//! optional backend that was unavailable at startup is transparently
//! replaced by its designated fallback; the substitution is reported as a
//! notice that the executor carries into the final explanation.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::llm::{
    Corrector, FallbackCorrector, LocalLmCorrector, RemoteLmCorrector, Seq2SeqCorrector,
};

// ---------------------------------------------------------------------------
// BackendKind
// ---------------------------------------------------------------------------

/// The four correction backends a pipeline can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Dedicated spelling-correction sequence model.
    Sequence,
    /// Local causal LM.
    LocalLm,
    /// Remote causal LM.
    RemoteLm,
    /// Refinement model.
    Refiner,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::Sequence => "sequence",
            BackendKind::LocalLm => "local_lm",
            BackendKind::RemoteLm => "remote_lm",
            BackendKind::Refiner => "refiner",
        }
    }

    /// Backend substituted when this one is unavailable.
    pub fn fallback(self) -> Option<BackendKind> {
        match self {
            BackendKind::RemoteLm => Some(BackendKind::LocalLm),
            BackendKind::LocalLm => Some(BackendKind::Sequence),
            BackendKind::Sequence | BackendKind::Refiner => None,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// BackendSelectors
// ---------------------------------------------------------------------------

/// Per-request model selectors for backends with variants.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSelectors {
    /// Key into the local causal LM's variant map.
    pub local_model: Option<String>,
    /// Model name on the remote service.
    pub remote_model: Option<String>,
}

impl BackendSelectors {
    /// Selector that applies to `kind`, if any.
    pub fn for_kind(&self, kind: BackendKind) -> Option<&str> {
        match kind {
            BackendKind::LocalLm => self.local_model.as_deref(),
            BackendKind::RemoteLm => self.remote_model.as_deref(),
            BackendKind::Sequence | BackendKind::Refiner => None,
        }
    }
}

// ---------------------------------------------------------------------------
// BackendSet
// ---------------------------------------------------------------------------

/// One registered backend.
#[derive(Clone)]
pub struct Backend {
    pub corrector: FallbackCorrector,
    pub available: bool,
}

/// Outcome of [`BackendSet::resolve`].
pub struct Resolved {
    /// Backend that will actually run; `None` means pass the text through.
    pub backend: Option<(BackendKind, FallbackCorrector)>,
    /// Substitution notices, in the order they happened.
    pub notices: Vec<String>,
}

/// All backends known to the executor.
#[derive(Clone, Default)]
pub struct BackendSet {
    backends: BTreeMap<BackendKind, Backend>,
}

impl BackendSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `corrector` as `kind`.
    pub fn with(mut self, kind: BackendKind, corrector: Arc<dyn Corrector>, available: bool) -> Self {
        self.backends.insert(
            kind,
            Backend {
                corrector: FallbackCorrector::new(corrector),
                available,
            },
        );
        self
    }

    /// Build every backend from `config` and probe each one once.
    pub async fn from_config(config: &AppConfig) -> Self {
        let sequence: Arc<dyn Corrector> =
            Arc::new(Seq2SeqCorrector::from_config("BartPho", &config.sequence_model));
        let local: Arc<dyn Corrector> = Arc::new(LocalLmCorrector::from_config(&config.local_lm));
        let remote: Arc<dyn Corrector> = Arc::new(RemoteLmCorrector::from_config(&config.remote_lm));
        let refiner: Arc<dyn Corrector> =
            Arc::new(Seq2SeqCorrector::from_config("ProtonX", &config.refiner));

        let (sequence_ok, local_ok, remote_ok, refiner_ok) =
            tokio::join!(sequence.probe(), local.probe(), remote.probe(), refiner.probe());
        let local_ok = config.local_lm.enabled && local_ok;

        let set = Self::new()
            .with(BackendKind::Sequence, sequence, sequence_ok)
            .with(BackendKind::LocalLm, local, local_ok)
            .with(BackendKind::RemoteLm, remote, remote_ok)
            .with(BackendKind::Refiner, refiner, refiner_ok);

        for (kind, backend) in set.iter() {
            if backend.available {
                log::info!("backends: {kind} ({}) available", backend.corrector.name());
            } else {
                log::warn!("backends: {kind} ({}) unavailable", backend.corrector.name());
            }
        }
        set
    }

    pub fn get(&self, kind: BackendKind) -> Option<&Backend> {
        self.backends.get(&kind)
    }

    pub fn is_available(&self, kind: BackendKind) -> bool {
        self.get(kind).is_some_and(|b| b.available)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BackendKind, &Backend)> {
        self.backends.iter().map(|(k, b)| (*k, b))
    }

    /// Follow the fallback chain from `kind` to the first available
    /// backend.
    pub fn resolve(&self, kind: BackendKind) -> Resolved {
        let mut current = Some(kind);
        while let Some(candidate) = current {
            if let Some(backend) = self.get(candidate).filter(|b| b.available) {
                let mut notices = Vec::new();
                if candidate != kind {
                    log::warn!("backends: {kind} unavailable, using {candidate}");
                    notices.push(format!(
                        "⚠️ {} không khả dụng. Đã dùng {}.",
                        self.display_name(kind),
                        backend.corrector.name()
                    ));
                }
                return Resolved {
                    backend: Some((candidate, backend.corrector.clone())),
                    notices,
                };
            }
            current = candidate.fallback();
        }

        log::warn!("backends: no available backend for {kind}, passing text through");
        Resolved {
            backend: None,
            notices: vec![format!(
                "⚠️ {} không khả dụng. Giữ nguyên văn bản.",
                self.display_name(kind)
            )],
        }
    }

    fn display_name(&self, kind: BackendKind) -> String {
        self.get(kind)
            .map(|b| b.corrector.name().to_string())
            .unwrap_or_else(|| kind.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
