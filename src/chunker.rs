//! Bounded, overlapping chunking of page text.
//!
//! The chunker turns a page's extracted text into the ordered chunk sequence
//! the [`VectorIndex`](crate::index::VectorIndex) embeds. Windows are sized in
//! characters, each window overlapping its predecessor by a fixed amount so
//! sentence fragments at a boundary survive in at least one chunk.

use thiserror::Error;

/// Default maximum chunk size, in characters.
pub const DEFAULT_MAX_CHARS: usize = 4096;
/// Default overlap between neighboring chunks, in characters.
pub const DEFAULT_OVERLAP: usize = 100;

/// A contiguous slice of page content, at most `max_chars` characters long.
///
/// Chunks are produced fresh on each indexing pass and never persisted
/// across page loads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
}

impl Chunk {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

/// Configuration errors raised at [`ChunkerConfig`] construction.
#[derive(Debug, Error)]
pub enum ChunkerError {
    /// The overlap must leave room for the window to advance.
    #[error("overlap ({overlap}) must be smaller than max_chars ({max_chars})")]
    OverlapTooLarge { max_chars: usize, overlap: usize },

    /// Zero-width windows cannot make progress.
    #[error("max_chars must be greater than zero")]
    ZeroWindow,
}

/// Window configuration for [`split`].
///
/// # Examples
///
/// ```
/// use pagelens::chunker::ChunkerConfig;
///
/// let config = ChunkerConfig::new(4096, 100).unwrap();
/// let chunks = config.split("short page");
/// assert_eq!(chunks.len(), 1);
/// assert_eq!(chunks[0].text, "short page");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChunkerConfig {
    max_chars: usize,
    overlap: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl ChunkerConfig {
    /// Create a config, rejecting degenerate windows up front.
    pub fn new(max_chars: usize, overlap: usize) -> Result<Self, ChunkerError> {
        if max_chars == 0 {
            return Err(ChunkerError::ZeroWindow);
        }
        if overlap >= max_chars {
            return Err(ChunkerError::OverlapTooLarge { max_chars, overlap });
        }
        Ok(Self { max_chars, overlap })
    }

    #[must_use]
    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    #[must_use]
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split `text` into ordered, overlapping chunks.
    ///
    /// Guarantees:
    /// - empty input yields an empty sequence;
    /// - input no longer than `max_chars` yields exactly one chunk equal to
    ///   the whole text;
    /// - otherwise every chunk is at most `max_chars` characters and chunk
    ///   `i + 1` begins exactly `overlap` characters before the end of chunk
    ///   `i`'s window, so stripping the first `overlap` characters from every
    ///   chunk but the first and concatenating reconstructs `text`.
    ///
    /// Offsets are measured in `char`s, never bytes, so multi-byte text
    /// cannot split mid-codepoint.
    #[must_use]
    pub fn split(&self, text: &str) -> Vec<Chunk> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }
        if chars.len() <= self.max_chars {
            return vec![Chunk::new(text)];
        }

        let mut chunks = Vec::new();
        let mut start = 0usize;
        loop {
            let end = usize::min(start + self.max_chars, chars.len());
            chunks.push(Chunk::new(chars[start..end].iter().collect::<String>()));
            if end == chars.len() {
                break;
            }
            start = end - self.overlap;
        }
        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_no_chunks() {
        let config = ChunkerConfig::default();
        assert!(config.split("").is_empty());
    }

    #[test]
    fn short_input_yields_single_chunk() {
        let config = ChunkerConfig::new(64, 8).unwrap();
        let chunks = config.split("just one chunk");
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "just one chunk");
    }

    #[test]
    fn rejects_overlap_at_or_above_window() {
        assert!(ChunkerConfig::new(100, 100).is_err());
        assert!(ChunkerConfig::new(100, 150).is_err());
        assert!(ChunkerConfig::new(0, 0).is_err());
    }

    #[test]
    fn ten_thousand_chars_split_into_three_windows() {
        // 10_000 chars at max 4096 / overlap 100: [0, 4096), [3996, 8092), [7992, 10000)
        let text: String = ('a'..='z').cycle().take(10_000).collect();
        let config = ChunkerConfig::new(4096, 100).unwrap();
        let chunks = config.split(&text);

        assert_eq!(chunks.len(), 3);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 4096);
        }

        let source: Vec<char> = text.chars().collect();
        let second_start: String = source[3996..4096].iter().collect();
        assert!(chunks[1].text.starts_with(&second_start));
    }

    #[test]
    fn overlap_prefix_matches_previous_suffix() {
        let text: String = "0123456789".chars().cycle().take(250).collect();
        let config = ChunkerConfig::new(100, 10).unwrap();
        let chunks = config.split(&text);

        for pair in chunks.windows(2) {
            let prev: Vec<char> = pair[0].text.chars().collect();
            let tail: String = prev[prev.len() - 10..].iter().collect();
            assert!(pair[1].text.starts_with(&tail));
        }
    }

    #[test]
    fn multibyte_text_splits_on_char_boundaries() {
        let text: String = "héllo wörld ünïcode ".chars().cycle().take(300).collect();
        let config = ChunkerConfig::new(64, 8).unwrap();
        let chunks = config.split(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 64);
        }
    }
}
