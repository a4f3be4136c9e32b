use anyhow::{ensure, Result};
use std::collections::HashMap;
use tracing::debug;

use docqa_core::config::RetrievalSettings;
use docqa_core::types::{sort_hits, RetrievedPassage, ScoreNormalization, SearchHit, SourceKind};
use docqa_embed::ModelServices;

use crate::index::ChunkIndex;

/// Candidate counts and score handling for one hybrid query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridOptions {
    pub k_dense: usize,
    pub k_bm25: usize,
    pub top_k: usize,
    pub normalization: ScoreNormalization,
}

impl Default for HybridOptions {
    fn default() -> Self {
        Self { k_dense: 30, k_bm25: 30, top_k: 8, normalization: ScoreNormalization::MinMax }
    }
}

impl From<&RetrievalSettings> for HybridOptions {
    fn from(s: &RetrievalSettings) -> Self {
        Self { k_dense: s.k_dense, k_bm25: s.k_bm25, top_k: s.top_k, normalization: s.normalization }
    }
}

/// Number of merged candidates handed to the cross-encoder.
pub fn shortlist_size(top_k: usize) -> usize {
    (top_k * 4).max(20)
}

/// Brings one candidate list onto the common merge scale.
pub fn normalize(hits: &mut [SearchHit], normalization: ScoreNormalization) {
    match normalization {
        ScoreNormalization::MinMax => {
            let Some(first) = hits.first() else { return };
            let (min, max) = hits.iter().fold((first.score, first.score), |(lo, hi), h| (lo.min(h.score), hi.max(h.score)));
            let range = max - min;
            for h in hits.iter_mut() {
                h.score = if range > f32::EPSILON { (h.score - min) / range } else { 1.0 };
            }
        }
        ScoreNormalization::Scale { dense, lexical } => {
            for h in hits.iter_mut() {
                let divisor = if h.source == SourceKind::Text { lexical } else { dense };
                if divisor != 0.0 {
                    h.score /= divisor;
                }
            }
        }
    }
}

/// Union of both lists keyed by position, keeping the larger score, ranked.
pub fn merge_max(dense: &[SearchHit], lexical: &[SearchHit]) -> Vec<SearchHit> {
    let mut by_position: HashMap<usize, f32> = HashMap::new();
    for h in dense.iter().chain(lexical) {
        by_position
            .entry(h.position)
            .and_modify(|s| {
                if h.score > *s {
                    *s = h.score;
                }
            })
            .or_insert(h.score);
    }
    let mut merged: Vec<SearchHit> = by_position
        .into_iter()
        .map(|(position, score)| SearchHit::new(position, score, SourceKind::Fused))
        .collect();
    sort_hits(&mut merged);
    merged
}

/// Dense + BM25 retrieval over a [`ChunkIndex`], reordered by a cross-encoder.
pub struct HybridSearchEngine {
    index: ChunkIndex,
    models: ModelServices,
    options: HybridOptions,
}

impl HybridSearchEngine {
    pub fn new(index: ChunkIndex, models: ModelServices, options: HybridOptions) -> Self {
        Self { index, models, options }
    }

    pub fn index(&self) -> &ChunkIndex {
        &self.index
    }

    pub fn options(&self) -> &HybridOptions {
        &self.options
    }

    pub async fn hybrid_search(&self, query: &str, k_dense: usize, k_bm25: usize, top_k: usize) -> Result<Vec<SearchHit>> {
        if top_k == 0 || self.index.is_empty() {
            return Ok(Vec::new());
        }
        let mut dense = self.index.dense_search(self.models.embedder.as_ref(), query, k_dense).await?;
        let mut lexical = self.index.lexical_search(query, k_bm25)?;
        normalize(&mut dense, self.options.normalization);
        normalize(&mut lexical, self.options.normalization);

        let mut shortlist = merge_max(&dense, &lexical);
        shortlist.truncate(shortlist_size(top_k));
        debug!(dense = dense.len(), lexical = lexical.len(), shortlist = shortlist.len(), "merged candidates");
        if shortlist.is_empty() {
            return Ok(shortlist);
        }

        let texts: Vec<&str> = shortlist.iter().filter_map(|h| self.index.text(h.position)).collect();
        ensure!(texts.len() == shortlist.len(), "candidate position outside the index");
        let scores = self.models.reranker.score(query, &texts)?;
        ensure!(scores.len() == shortlist.len(), "reranker returned {} scores for {} passages", scores.len(), shortlist.len());

        let mut reranked: Vec<SearchHit> = shortlist
            .iter()
            .zip(scores)
            .map(|(h, score)| SearchHit::new(h.position, score, SourceKind::CrossEncoder))
            .collect();
        sort_hits(&mut reranked);
        reranked.truncate(top_k);
        Ok(reranked)
    }

    /// Ranked passages using the configured candidate counts.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedPassage>> {
        let hits = self.hybrid_search(query, self.options.k_dense, self.options.k_bm25, top_k).await?;
        Ok(hits.iter().filter_map(|h| self.index.passage(h)).collect())
    }

    pub fn into_parts(self) -> (ChunkIndex, ModelServices) {
        (self.index, self.models)
    }
}
