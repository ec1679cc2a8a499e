//! Text utilities shared by every backend and pipeline stage.
//!
//! * [`chunk_text`] — sentence-bounded chunking under a word budget.
//! * [`is_meaningful`], [`explain`], [`change_note`] — diff and
//!   explanation helpers.

pub mod chunker;
pub mod diff;

pub use chunker::{chunk_text, join_chunks, word_count};
pub use diff::{
    change_note, explain, is_meaningful, word_diff, DiffOp, DEFAULT_MIN_WORDS,
    FORMAT_ONLY_MESSAGE, NO_CHANGE_MESSAGE,
};
