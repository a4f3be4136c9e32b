/// Sentence embedding model producing fixed-size, L2-normalized vectors.
pub trait Embedder: Send + Sync {
    /// Identifier persisted with an index so a mismatched model can be detected on load.
    fn model_id(&self) -> String;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Joint (query, passage) relevance model. Higher is more relevant.
pub trait Reranker: Send + Sync {
    fn model_id(&self) -> String;
    fn score(&self, query: &str, passages: &[&str]) -> anyhow::Result<Vec<f32>>;
}
