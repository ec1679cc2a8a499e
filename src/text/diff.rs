//! Word-level change summaries.
//!
//! * [`is_meaningful`] — gate that keeps trivial fragments (stray
//!   punctuation, numbering) away from the backends.
//! * [`explain`] — one-line "what changed" summary built from the set
//!   difference of lowercased words.
//! * [`change_note`] — multi-line report with an ordered word diff, used as
//!   the annotation attached to a corrected paragraph.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Returned by [`explain`] when nothing changed.
pub const NO_CHANGE_MESSAGE: &str = "Không có thay đổi.";

/// Returned by [`explain`] when the strings differ but their word sets do
/// not (case, diacritic or spacing edits only).
pub const FORMAT_ONLY_MESSAGE: &str = "Đã sửa dấu và định dạng.";

/// Default minimum word count for [`is_meaningful`].
pub const DEFAULT_MIN_WORDS: usize = 3;

const MAX_EXPLAINED_WORDS: usize = 5;
const MAX_NOTE_ENTRIES: usize = 20;

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\p{L}+").expect("word regex"));

/// `true` when `text` contains at least `min_words` alphabetic runs
/// (accented letters included).
///
/// ```rust
/// use viet_corrector::text::is_meaningful;
///
/// assert!(!is_meaningful("", 3));
/// assert!(!is_meaningful("a b", 3));
/// assert!(is_meaningful("một hai ba", 3));
/// ```
pub fn is_meaningful(text: &str, min_words: usize) -> bool {
    if text.trim().is_empty() {
        return false;
    }
    WORD_RE.find_iter(text).count() >= min_words
}

/// Short summary of the words removed and added between `original` and
/// `corrected`.
pub fn explain(original: &str, corrected: &str) -> String {
    if original.trim() == corrected.trim() {
        return NO_CHANGE_MESSAGE.to_string();
    }

    let original_lower = original.to_lowercase();
    let corrected_lower = corrected.to_lowercase();
    let original_words: HashSet<&str> = original_lower.split_whitespace().collect();
    let corrected_words: HashSet<&str> = corrected_lower.split_whitespace().collect();

    let removed = ordered_difference(&original_lower, &corrected_words);
    let added = ordered_difference(&corrected_lower, &original_words);

    let mut parts = Vec::with_capacity(2);
    if !removed.is_empty() {
        parts.push(format!("Sửa: {}", removed.join(", ")));
    }
    if !added.is_empty() {
        parts.push(format!("Thành: {}", added.join(", ")));
    }

    if parts.is_empty() {
        FORMAT_ONLY_MESSAGE.to_string()
    } else {
        parts.join(" → ")
    }
}

/// Detailed change report, or `None` when the texts match after trimming.
pub fn change_note(original: &str, corrected: &str) -> Option<String> {
    if original.trim() == corrected.trim() {
        return None;
    }

    let before: Vec<&str> = original.split_whitespace().collect();
    let after: Vec<&str> = corrected.split_whitespace().collect();

    let changes: Vec<String> = word_diff(&before, &after)
        .into_iter()
        .filter_map(|op| match op {
            DiffOp::Delete(w) => Some(format!("Bỏ: {w}")),
            DiffOp::Insert(w) => Some(format!("Thêm: {w}")),
            DiffOp::Equal(_) => None,
        })
        .take(MAX_NOTE_ENTRIES)
        .collect();

    Some(format!(
        "AI đã chỉnh sửa đoạn văn.\n\n\
         Đoạn gốc:\n{original}\n\n\
         Đoạn sau khi sửa:\n{corrected}\n\n\
         Chi tiết thay đổi:\n- {}",
        changes.join("\n- ")
    ))
}

/// Words of `text` absent from `other`, first occurrence order, capped.
fn ordered_difference<'a>(text: &'a str, other: &HashSet<&str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    text.split_whitespace()
        .filter(|w| !other.contains(w) && seen.insert(*w))
        .take(MAX_EXPLAINED_WORDS)
        .collect()
}

// ---------------------------------------------------------------------------
// Word diff
// ---------------------------------------------------------------------------

/// One entry of a word-level edit script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffOp<'a> {
    Equal(&'a str),
    Delete(&'a str),
    Insert(&'a str),
}

/// Longest-common-subsequence edit script from `a` to `b`.
///
/// Within a replaced region deletions come before insertions.  The common
/// prefix and suffix are stripped first; the middle is aligned in linear
/// space, so memory stays proportional to the input length.
pub fn word_diff<'a>(a: &[&'a str], b: &[&'a str]) -> Vec<DiffOp<'a>> {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();

    let a_mid = &a[prefix..a.len() - suffix];
    let b_mid = &b[prefix..b.len() - suffix];

    let mut ops: Vec<DiffOp<'a>> = a[..prefix].iter().map(|w| DiffOp::Equal(*w)).collect();
    ops.extend(lcs_script(a_mid, b_mid));
    ops.extend(a[a.len() - suffix..].iter().map(|w| DiffOp::Equal(*w)));
    ops
}

fn lcs_script<'a>(a: &[&'a str], b: &[&'a str]) -> Vec<DiffOp<'a>> {
    let mut pairs = Vec::new();
    lcs_pairs(a, b, 0, 0, &mut pairs);

    let mut ops = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    for (pi, pj) in pairs.into_iter().chain(std::iter::once((a.len(), b.len()))) {
        ops.extend(a[i..pi].iter().map(|w| DiffOp::Delete(*w)));
        ops.extend(b[j..pj].iter().map(|w| DiffOp::Insert(*w)));
        if pi < a.len() {
            ops.push(DiffOp::Equal(a[pi]));
        }
        i = pi + 1;
        j = pj + 1;
    }
    ops
}

/// Index pairs `(i, j)` with `a[i] == b[j]` forming one longest common
/// subsequence, in order (Hirschberg's divide and conquer).
fn lcs_pairs(a: &[&str], b: &[&str], a_off: usize, b_off: usize, out: &mut Vec<(usize, usize)>) {
    if a.is_empty() || b.is_empty() {
        return;
    }
    if a.len() == 1 {
        if let Some(j) = b.iter().position(|w| *w == a[0]) {
            out.push((a_off, b_off + j));
        }
        return;
    }

    let mid = a.len() / 2;
    let a_tail: Vec<&str> = a[mid..].iter().rev().copied().collect();
    let b_rev: Vec<&str> = b.iter().rev().copied().collect();
    let forward = lcs_row(&a[..mid], b);
    let backward = lcs_row(&a_tail, &b_rev);

    // forward[j]  = LCS(a[..mid], b[..j])
    // backward[k] = LCS(a[mid..], b[b.len() - k..])
    let m = b.len();
    let mut split = 0;
    let mut best = 0;
    for j in 0..=m {
        let score = forward[j] + backward[m - j];
        if score > best {
            best = score;
            split = j;
        }
    }

    lcs_pairs(&a[..mid], &b[..split], a_off, b_off, out);
    lcs_pairs(&a[mid..], &b[split..], a_off + mid, b_off + split, out);
}

/// Last row of the LCS table of `a` against every prefix of `b`.
fn lcs_row(a: &[&str], b: &[&str]) -> Vec<u32> {
    let mut prev = vec![0u32; b.len() + 1];
    let mut cur = vec![0u32; b.len() + 1];
    for x in a {
        for (j, y) in b.iter().enumerate() {
            cur[j + 1] = if x == y {
                prev[j] + 1
            } else {
                prev[j + 1].max(cur[j])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
