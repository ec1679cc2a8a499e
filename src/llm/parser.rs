//! Extraction of the corrected text and explanation from free-form model
//! output.
//!
//! Generative backends are asked for a [`CORRECTED_TAG`] section followed by
//! an [`EXPLANATION_TAG`] section, but the raw generation may echo the whole
//! instruction block first, misspell the explanation tag's diacritics, wrap
//! the answer in code fences or stop mid-tag.  Parsing therefore runs down a
//! fixed ladder and never fails:
//!
//! 1. last tagged corrected-text block,
//! 2. text after the last [`LEGACY_MARKER`],
//! 3. the source text, unchanged.
//!
//! [`CORRECTED_TAG`]: crate::llm::prompt::CORRECTED_TAG
//! [`EXPLANATION_TAG`]: crate::llm::prompt::EXPLANATION_TAG

use once_cell::sync::Lazy;
use regex::Regex;

use crate::llm::corrector::Correction;
use crate::llm::prompt::LEGACY_MARKER;

static CORRECTED_OPEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\[VĂN BẢN ĐÃ SỬA\]").expect("corrected tag regex"));

/// Explanation tag, tolerant of the diacritic misspellings models produce
/// (`GIẢI THICH`, `GIẢI THỊCH`, `GIẢI THÍT`, …).
static EXPLANATION_OPEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\[GIẢI TH[IÍỊ][ÊẾỆ]?[CT]H?\]").expect("explanation tag regex")
});

/// Anything that closes a corrected-text block.
static BLOCK_END_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\[GIẢI TH[IÍỊ][ÊẾỆ]?[CT]H?\]|\[VĂN BẢN|```").expect("block end regex")
});

static FENCED_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)```.*?```").expect("fence regex"));

static TRAILING_EXPLANATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\[GIẢI TH.*").expect("trailing section regex"));

/// An unterminated upper-case tag left at the very end, e.g. `[GIẢ`.
static TRAILING_TAG_FRAGMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[\p{Lu}[\p{Lu} ]*\]?\s*$").expect("tag fragment regex"));

// ---------------------------------------------------------------------------
// ParsedGeneration
// ---------------------------------------------------------------------------

/// Which rung of the parsing ladder produced the corrected text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseSource {
    /// Last tagged corrected-text block.
    Tagged,
    /// Text after the legacy marker.
    Legacy,
    /// Nothing recognisable; the source text was kept.
    Unparsed,
}

/// Result of [`parse_generation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedGeneration {
    pub corrected: String,
    pub explanation: String,
    pub source: ParseSource,
}

impl From<ParsedGeneration> for Correction {
    fn from(parsed: ParsedGeneration) -> Self {
        Correction::new(parsed.corrected, parsed.explanation)
    }
}

/// Parse `raw` model output produced for `source`.
///
/// ```rust
/// use viet_corrector::llm::{parse_generation, ParseSource};
///
/// let raw = "[VĂN BẢN ĐÃ SỬA]\nTôi đi Hồ Gươm\n\n[GIẢI THÍCH]\nThêm dấu.";
/// let parsed = parse_generation(raw, "toi di Ho Guom");
/// assert_eq!(parsed.corrected, "Tôi đi Hồ Gươm");
/// assert_eq!(parsed.explanation, "Thêm dấu.");
/// assert_eq!(parsed.source, ParseSource::Tagged);
/// ```
pub fn parse_generation(raw: &str, source: &str) -> ParsedGeneration {
    let explanation = extract_explanation(raw);

    let candidate = if let Some(block) = last_tagged_block(raw) {
        Some((block, ParseSource::Tagged))
    } else {
        raw.rsplit_once(LEGACY_MARKER)
            .map(|(_, tail)| (tail, ParseSource::Legacy))
    };

    if let Some((text, source_kind)) = candidate {
        let cleaned = clean_corrected(text);
        if !cleaned.is_empty() {
            return ParsedGeneration {
                corrected: cleaned,
                explanation,
                source: source_kind,
            };
        }
        log::warn!("parser: {source_kind:?} block was empty after cleaning, keeping source text");
    } else {
        log::warn!("parser: no structured output found, keeping source text");
    }

    ParsedGeneration {
        corrected: source.trim().to_string(),
        explanation,
        source: ParseSource::Unparsed,
    }
}

/// Body of the last corrected-text block, up to the next section boundary
/// or the end of the output.
fn last_tagged_block(raw: &str) -> Option<&str> {
    let open = CORRECTED_OPEN_RE.find_iter(raw).last()?;
    let rest = &raw[open.end()..];
    let end = BLOCK_END_RE.find(rest).map_or(rest.len(), |m| m.start());
    Some(&rest[..end])
}

/// Everything after the last explanation tag, or empty.
fn extract_explanation(raw: &str) -> String {
    EXPLANATION_OPEN_RE
        .find_iter(raw)
        .last()
        .map(|m| trim_output(&raw[m.end()..]).to_string())
        .unwrap_or_default()
}

fn clean_corrected(text: &str) -> String {
    let text = FENCED_RE.replace_all(text, "");
    let text = TRAILING_EXPLANATION_RE.replace(&text, "");
    let text = TRAILING_TAG_FRAGMENT_RE.replace(&text, "");
    trim_output(&text).to_string()
}

fn trim_output(text: &str) -> &str {
    text.trim_matches(|c: char| c == '`' || c.is_whitespace())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
