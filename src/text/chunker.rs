//! Sentence-bounded chunking of long text.
//!
//! Backends that enforce a word budget never see more than
//! `max_words` words at once unless a single sentence is itself longer than
//! the budget; sentences are never cut.  A sentence ends at a `.`, `!` or
//! `?` that is followed by whitespace, and the terminator stays with the
//! sentence it closes.
//!
//! Chunks are rebuilt from whitespace-separated tokens, so joining them with
//! single spaces reproduces the input's token sequence exactly.
//!
//! ```rust
//! use viet_corrector::text::chunk_text;
//!
//! let chunks = chunk_text("Một hai. Ba bốn năm. Sáu!", 3);
//! assert_eq!(chunks, vec!["Một hai.", "Ba bốn năm.", "Sáu!"]);
//! ```

/// Number of whitespace-separated words in `text`.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Split `text` into sentence-aligned chunks of at most `max_words` words.
///
/// Text already within budget comes back as a single (trimmed) chunk.  A
/// `max_words` of zero is treated as one.
pub fn chunk_text(text: &str, max_words: usize) -> Vec<String> {
    let max_words = max_words.max(1);
    if word_count(text) <= max_words {
        return vec![text.trim().to_string()];
    }

    let mut chunks: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for sentence in split_sentences(text) {
        let len = sentence.len();

        if len > max_words {
            // Oversized sentence: close the running chunk, emit it alone.
            if !current.is_empty() {
                chunks.push(current.join(" "));
                current.clear();
            }
            chunks.push(sentence.join(" "));
        } else if current.len() + len <= max_words {
            current.extend(sentence);
        } else {
            if !current.is_empty() {
                chunks.push(current.join(" "));
            }
            current = sentence;
        }
    }

    if !current.is_empty() {
        chunks.push(current.join(" "));
    }

    log::debug!(
        "chunker: split {} words into {} chunks (max {max_words} words/chunk)",
        word_count(text),
        chunks.len()
    );
    chunks
}

/// Join chunk outputs back into one text, in order, with single spaces.
pub fn join_chunks<S: AsRef<str>>(chunks: &[S]) -> String {
    chunks
        .iter()
        .map(|c| c.as_ref().trim())
        .filter(|c| !c.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Group the words of `text` into sentences.
///
/// A word ending in a terminator is followed by whitespace (or is the last
/// word), which is exactly the boundary rule.
fn split_sentences(text: &str) -> Vec<Vec<&str>> {
    let mut sentences = Vec::new();
    let mut current = Vec::new();

    for word in text.split_whitespace() {
        current.push(word);
        if word.ends_with(['.', '!', '?']) {
            sentences.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        sentences.push(current);
    }
    sentences
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
