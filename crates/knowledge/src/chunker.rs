//! Word-window chunking with configurable size and overlap.

use vcraft_core::{AppError, AppResult};

/// Window size and overlap used when loading a knowledge base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPolicy {
    /// Words per chunk
    pub chunk_size: usize,
    /// Words shared by consecutive chunks
    pub overlap: usize,
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 50,
        }
    }
}

impl ChunkPolicy {
    /// Create a policy, rejecting `overlap >= chunk_size`.
    pub fn new(chunk_size: usize, overlap: usize) -> AppResult<Self> {
        let policy = Self {
            chunk_size,
            overlap,
        };
        policy.validate()?;
        Ok(policy)
    }

    /// Check `0 <= overlap < chunk_size`.
    pub fn validate(&self) -> AppResult<()> {
        if self.overlap >= self.chunk_size {
            return Err(AppError::InvalidChunking {
                chunk_size: self.chunk_size,
                overlap: self.overlap,
            });
        }
        Ok(())
    }

    /// Chunk `text` with this policy.
    pub fn apply(&self, text: &str) -> AppResult<Vec<String>> {
        chunk(text, self.chunk_size, self.overlap)
    }
}

/// Split `text` into overlapping windows of whitespace-separated words.
///
/// Windows hold `chunk_size` words and start every `chunk_size - overlap`
/// words. The walk stops at the first window that reaches the last word, so
/// the final window may be shorter and no window is a pure suffix of the one
/// before it. Words are re-joined with single spaces.
///
/// ```
/// use vcraft_knowledge::chunker::chunk;
///
/// let chunks = chunk("a b c d e", 3, 1).unwrap();
/// assert_eq!(chunks, vec!["a b c", "c d e"]);
/// ```
pub fn chunk(text: &str, chunk_size: usize, overlap: usize) -> AppResult<Vec<String>> {
    if overlap >= chunk_size {
        return Err(AppError::InvalidChunking {
            chunk_size,
            overlap,
        });
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Ok(Vec::new());
    }

    let step = chunk_size - overlap;
    let mut chunks = Vec::with_capacity(words.len() / step + 1);
    let mut start = 0;

    loop {
        let end = (start + chunk_size).min(words.len());
        chunks.push(words[start..end].join(" "));

        if end == words.len() {
            break;
        }
        start += step;
    }

    Ok(chunks)
}
