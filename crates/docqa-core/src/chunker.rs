//! Overlapping fixed-size word windows.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Window size and overlap, both counted in whitespace-delimited words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub size: usize,
    pub overlap: usize,
}

impl ChunkingConfig {
    pub const PDF: Self = Self { size: 180, overlap: 30 };
    pub const EXCEL: Self = Self { size: 220, overlap: 40 };

    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        let cfg = Self { size, overlap };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.size == 0 {
            return Err(Error::InvalidConfig("chunk size must be positive".into()));
        }
        if self.overlap >= self.size {
            return Err(Error::InvalidConfig(format!(
                "chunk overlap {} must be smaller than size {}",
                self.overlap, self.size
            )));
        }
        Ok(())
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self::PDF
    }
}

/// Lazily yields windows of `size` words, each starting `size - overlap`
/// words after the previous one. The window that reaches the last word is
/// the final one, so a tail already covered by its predecessor is never
/// emitted on its own.
#[derive(Debug, Clone)]
pub struct WordWindows<'a> {
    words: Vec<&'a str>,
    start: usize,
    size: usize,
    overlap: usize,
    done: bool,
}

impl<'a> WordWindows<'a> {
    pub fn new(text: &'a str, cfg: ChunkingConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self {
            words: text.split_whitespace().collect(),
            start: 0,
            size: cfg.size,
            overlap: cfg.overlap,
            done: false,
        })
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }
}

impl Iterator for WordWindows<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.done || self.start >= self.words.len() {
            return None;
        }
        let end = (self.start + self.size).min(self.words.len());
        let window = self.words[self.start..end].join(" ");
        if end >= self.words.len() {
            self.done = true;
        } else {
            self.start = end - self.overlap;
        }
        Some(window)
    }
}

/// Convenience wrapper collecting every window of `text`.
pub fn chunk_words(text: &str, cfg: ChunkingConfig) -> Result<Vec<String>> {
    Ok(WordWindows::new(text, cfg)?.collect())
}
