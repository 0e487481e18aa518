//! Sentence re-segmentation of streamed generation output.
//!
//! Generation deltas arrive on arbitrary token boundaries. The chunker holds
//! back text until a `.` shows up, then releases everything up to the last
//! `.` as one speakable chunk. Every `.` counts as a boundary, including the
//! ones in abbreviations, decimals and ellipses.

use crate::pipeline::types::SentenceChunk;

const DELIMITER: char = '.';

/// Splits `prefix + new_text` at sentence delimiters.
///
/// Returns the completed chunks (zero or one: all complete sentences found are
/// batched together) and the text after the last delimiter, which becomes the
/// next prefix.
pub fn chunk(prefix: &str, new_text: &str) -> (Vec<String>, String) {
    let combined = format!("{prefix}{new_text}");
    match combined.rfind(DELIMITER) {
        Some(last) => {
            let complete = combined[..last].trim_start();
            let remaining = combined[last + DELIMITER.len_utf8()..].to_string();
            (vec![format!("{complete}{DELIMITER} ")], remaining)
        }
        None => (Vec::new(), combined),
    }
}

/// Stateful wrapper around [`chunk`] that owns the pending prefix for one
/// generation session.
#[derive(Debug, Default)]
pub struct SentenceChunker {
    pending: String,
}

impl SentenceChunker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a generation delta, returning a chunk if it completed a sentence.
    pub fn push(&mut self, delta: &str) -> Option<SentenceChunk> {
        let (chunks, remaining) = chunk(&self.pending, delta);
        self.pending = remaining;
        chunks.into_iter().next().map(SentenceChunk::new)
    }

    /// Flushes the undelimited remainder at stream end, appending a delimiter.
    ///
    /// Whitespace-only remainders produce nothing.
    pub fn finish(&mut self) -> Option<SentenceChunk> {
        let pending = std::mem::take(&mut self.pending);
        let text = pending.trim_start();
        if text.trim_end().is_empty() {
            return None;
        }
        Some(SentenceChunk::new(format!("{text}{DELIMITER}")))
    }

    /// Drops any pending text (used when a session fails or is cancelled).
    pub fn discard(&mut self) {
        self.pending.clear();
    }

    /// Text received but not yet released.
    pub fn pending(&self) -> &str {
        &self.pending
    }
}
