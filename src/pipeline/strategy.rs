//! Named correction strategies.
//!
//! Each [`PipelineKind`] is a fixed composition of one primary backend and
//! an optional refinement pass.  Names are the wire-level identifiers
//! callers send; unknown names are coerced to a default, never rejected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::pipeline::backends::BackendKind;

/// The six pipeline strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineKind {
    /// Local causal LM, then the refiner.
    #[serde(rename = "qwen_protonx")]
    LocalLmRefine,
    /// Local causal LM alone.
    #[serde(rename = "qwen_only")]
    LocalLmOnly,
    /// Refiner alone.
    #[serde(rename = "protonx_only")]
    RefineOnly,
    /// Sequence model, then the refiner.
    #[serde(rename = "bartpho_protonx")]
    SequenceRefine,
    /// Remote causal LM, then the refiner.
    #[serde(rename = "ollama_protonx")]
    RemoteLmRefine,
    /// Remote causal LM alone.
    #[serde(rename = "ollama_only")]
    RemoteLmOnly,
}

impl PipelineKind {
    pub const ALL: [PipelineKind; 6] = [
        PipelineKind::LocalLmRefine,
        PipelineKind::LocalLmOnly,
        PipelineKind::RefineOnly,
        PipelineKind::SequenceRefine,
        PipelineKind::RemoteLmRefine,
        PipelineKind::RemoteLmOnly,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PipelineKind::LocalLmRefine => "qwen_protonx",
            PipelineKind::LocalLmOnly => "qwen_only",
            PipelineKind::RefineOnly => "protonx_only",
            PipelineKind::SequenceRefine => "bartpho_protonx",
            PipelineKind::RemoteLmRefine => "ollama_protonx",
            PipelineKind::RemoteLmOnly => "ollama_only",
        }
    }

    /// Backend run first.
    pub fn primary(self) -> BackendKind {
        match self {
            PipelineKind::LocalLmRefine | PipelineKind::LocalLmOnly => BackendKind::LocalLm,
            PipelineKind::RefineOnly => BackendKind::Refiner,
            PipelineKind::SequenceRefine => BackendKind::Sequence,
            PipelineKind::RemoteLmRefine | PipelineKind::RemoteLmOnly => BackendKind::RemoteLm,
        }
    }

    /// Whether the primary output goes through the refiner afterwards.
    pub fn refines(self) -> bool {
        matches!(
            self,
            PipelineKind::LocalLmRefine | PipelineKind::SequenceRefine | PipelineKind::RemoteLmRefine
        )
    }

    /// Parse `name`, substituting `default` for missing or unknown names.
    pub fn parse_or(name: Option<&str>, default: PipelineKind) -> PipelineKind {
        match name.map(str::trim).filter(|n| !n.is_empty()) {
            None => default,
            Some(n) => n.parse().unwrap_or_else(|_| {
                log::warn!("pipeline: unknown pipeline '{n}', using '{default}'");
                default
            }),
        }
    }

    /// Every valid pipeline name, in declaration order.
    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(|k| k.as_str()).collect()
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned by [`PipelineKind::from_str`] for unrecognised names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown pipeline '{0}'")]
pub struct UnknownPipeline(pub String);

impl FromStr for PipelineKind {
    type Err = UnknownPipeline;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == needle)
            .ok_or_else(|| UnknownPipeline(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for kind in PipelineKind::ALL {
            assert_eq!(kind.as_str().parse::<PipelineKind>(), Ok(kind));
        }
        assert_eq!("  OLLAMA_ONLY ".parse(), Ok(PipelineKind::RemoteLmOnly));
    }

    #[test]
    fn unknown_name_is_coerced_to_default() {
        let default = PipelineKind::LocalLmRefine;
        assert_eq!(PipelineKind::parse_or(Some("gpt_magic"), default), default);
        assert_eq!(PipelineKind::parse_or(Some(""), default), default);
        assert_eq!(PipelineKind::parse_or(None, default), default);
        assert_eq!(
            PipelineKind::parse_or(Some("bartpho_protonx"), default),
            PipelineKind::SequenceRefine
        );
    }

    #[test]
    fn composition_table() {
        assert_eq!(PipelineKind::RemoteLmRefine.primary(), BackendKind::RemoteLm);
        assert!(PipelineKind::RemoteLmRefine.refines());
        assert_eq!(PipelineKind::RefineOnly.primary(), BackendKind::Refiner);
        assert!(!PipelineKind::RefineOnly.refines());
        assert!(!PipelineKind::LocalLmOnly.refines());
        assert_eq!(PipelineKind::names().len(), 6);
    }

    #[test]
    fn serde_uses_wire_names() {
        let json = serde_json::to_string(&PipelineKind::SequenceRefine).unwrap();
        assert_eq!(json, "\"bartpho_protonx\"");
    }
}
