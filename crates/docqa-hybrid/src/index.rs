use anyhow::Result;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use docqa_core::error::Error;
use docqa_core::traits::Embedder;
use docqa_core::types::{Chunk, RetrievedPassage, SearchHit};
use docqa_text::{Bm25Indexer, Bm25Searcher};
use docqa_vector::{VectorIndexWriter, VectorSearcher, DEFAULT_TABLE};

use crate::meta::{IndexMeta, META_FILE};

pub const VECTORS_DIR: &str = "vectors";
pub const LEXICAL_DIR: &str = "lexical";

/// Chunk sequence plus its dense and lexical indexes, all addressed by position.
pub struct ChunkIndex {
    dir: PathBuf,
    meta: IndexMeta,
    vectors: VectorSearcher,
    lexical: Bm25Searcher,
}

impl ChunkIndex {
    /// Builds every artifact into a sibling staging directory and swaps it
    /// into place only once all of them are written.
    pub async fn build(dir: &Path, chunks: &[Chunk], embedder: &dyn Embedder) -> Result<Self> {
        let staging = sibling(dir, "staging")?;
        if staging.exists() {
            std::fs::remove_dir_all(&staging)?;
        }
        std::fs::create_dir_all(&staging)?;

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let sources: Vec<String> = chunks.iter().map(Chunk::source_label).collect();
        info!(chunks = texts.len(), dir = %dir.display(), "building chunk index");

        let writer = VectorIndexWriter::create(&staging.join(VECTORS_DIR), DEFAULT_TABLE).await?;
        writer.write(embedder, &texts).await?;
        drop(writer);
        Bm25Indexer::create(&staging.join(LEXICAL_DIR))?.index_texts(&texts)?;
        IndexMeta::new(embedder.model_id(), embedder.dim(), texts, sources).write(&staging)?;

        swap_into_place(&staging, dir)?;
        Self::open(dir, embedder).await
    }

    /// Opens a persisted index. Missing artifacts yield [`Error::NoIndex`].
    pub async fn open(dir: &Path, embedder: &dyn Embedder) -> Result<Self> {
        let vectors_dir = dir.join(VECTORS_DIR);
        let lexical_dir = dir.join(LEXICAL_DIR);
        if !dir.join(META_FILE).is_file() || !vectors_dir.is_dir() || !lexical_dir.is_dir() {
            return Err(Error::NoIndex(dir.to_path_buf()).into());
        }
        let meta = IndexMeta::read(dir)?;
        if meta.dim != embedder.dim() {
            return Err(Error::InvalidConfig(format!(
                "index was built with {}-dim embeddings ({}), current embedder produces {} ({})",
                meta.dim,
                meta.embedder_id,
                embedder.dim(),
                embedder.model_id()
            ))
            .into());
        }
        if meta.embedder_id != embedder.model_id() {
            warn!(index = %meta.embedder_id, current = %embedder.model_id(), "embedder differs from the one used to build the index");
        }

        let vectors = VectorSearcher::open(&vectors_dir, DEFAULT_TABLE).await?;
        let lexical = Bm25Searcher::open(&lexical_dir)?;
        let lexical_docs = usize::try_from(lexical.num_docs())?;
        if vectors.len() != meta.len() || lexical_docs != meta.len() {
            return Err(Error::Operation(format!(
                "index at {} is inconsistent: {} chunks, {} vectors, {} lexical docs",
                dir.display(),
                meta.len(),
                vectors.len(),
                lexical_docs
            ))
            .into());
        }
        info!(chunks = meta.len(), dir = %dir.display(), "opened chunk index");
        Ok(Self { dir: dir.to_path_buf(), meta, vectors, lexical })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    pub fn len(&self) -> usize {
        self.meta.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meta.is_empty()
    }

    pub fn text(&self, position: usize) -> Option<&str> {
        self.meta.chunks.get(position).map(String::as_str)
    }

    pub fn source(&self, position: usize) -> Option<&str> {
        self.meta.sources.get(position).map(String::as_str)
    }

    pub fn passage(&self, hit: &SearchHit) -> Option<RetrievedPassage> {
        Some(RetrievedPassage {
            position: hit.position,
            score: hit.score,
            source_label: self.source(hit.position)?.to_string(),
            text: self.text(hit.position)?.to_string(),
        })
    }

    pub async fn dense_search(&self, embedder: &dyn Embedder, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        self.vectors.search(embedder, query, k).await
    }

    pub fn lexical_search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        self.lexical.search(query, k)
    }
}

/// `.<name>.<tag>-<pid>` next to `dir`.
fn sibling(dir: &Path, tag: &str) -> Result<PathBuf> {
    let name = dir
        .file_name()
        .ok_or_else(|| Error::InvalidConfig(format!("index path {} has no final component", dir.display())))?;
    let parent = dir.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    Ok(parent.join(format!(".{}.{}-{}", name.to_string_lossy(), tag, std::process::id())))
}

fn swap_into_place(staging: &Path, dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::rename(staging, dir)?;
        return Ok(());
    }
    let backup = sibling(dir, "old")?;
    if backup.exists() {
        std::fs::remove_dir_all(&backup)?;
    }
    std::fs::rename(dir, &backup)?;
    if let Err(e) = std::fs::rename(staging, dir) {
        std::fs::rename(&backup, dir)?;
        return Err(e.into());
    }
    if let Err(e) = std::fs::remove_dir_all(&backup) {
        warn!(path = %backup.display(), error = %e, "could not remove previous index");
    }
    Ok(())
}
