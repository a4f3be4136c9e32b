use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const META_FILE: &str = "meta.json";
pub const META_VERSION: u32 = 1;

/// Chunk texts and their source labels, stored as parallel arrays. Position
/// `i` in both arrays is position `i` in the vector and lexical indexes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMeta {
    pub version: u32,
    pub embedder_id: String,
    pub dim: usize,
    pub created_at: DateTime<Utc>,
    pub chunks: Vec<String>,
    pub sources: Vec<String>,
}

impl IndexMeta {
    pub fn new(embedder_id: String, dim: usize, chunks: Vec<String>, sources: Vec<String>) -> Self {
        Self { version: META_VERSION, embedder_id, dim, created_at: Utc::now(), chunks, sources }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != META_VERSION {
            bail!("unsupported index version {} (expected {})", self.version, META_VERSION);
        }
        if self.chunks.len() != self.sources.len() {
            bail!(
                "index metadata is inconsistent: {} chunks but {} sources",
                self.chunks.len(),
                self.sources.len()
            );
        }
        Ok(())
    }

    pub fn write(&self, dir: &Path) -> Result<()> {
        let path = dir.join(META_FILE);
        let json = serde_json::to_vec_pretty(self)?;
        std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    pub fn read(dir: &Path) -> Result<Self> {
        let path = dir.join(META_FILE);
        let bytes = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
        let meta: Self = serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display()))?;
        meta.validate()?;
        Ok(meta)
    }
}
