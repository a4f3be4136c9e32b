//! docqa-hybrid
//!
//! The persisted chunk index (metadata + vector + lexical artifacts) and the
//! hybrid ranker: dense and BM25 candidates are normalized, max-merged,
//! shortlisted and reordered with a cross-encoder.
pub mod index;
pub mod meta;
pub mod ranker;

pub use index::ChunkIndex;
pub use meta::IndexMeta;
pub use ranker::{merge_max, normalize, shortlist_size, HybridOptions, HybridSearchEngine};
