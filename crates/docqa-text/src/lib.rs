//! docqa-text
//!
//! BM25 lexical index over chunk texts, backed by tantivy. Tokenization is
//! plain whitespace splitting: case is preserved, nothing is stemmed or
//! dropped, and queries are tokenized the same way.
pub mod tantivy_utils;
pub mod index;
pub mod search;

pub use index::Bm25Indexer;
pub use search::Bm25Searcher;
