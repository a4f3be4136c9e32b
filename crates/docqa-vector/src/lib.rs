//! docqa-vector
//!
//! Flat (exact) cosine nearest-neighbour index over chunk embeddings, stored
//! as a LanceDB table of `(position, vector)` rows. No ANN index is trained,
//! so every search is a full scan.
pub mod schema;
pub mod search;
pub mod table;
pub mod writer;

pub use search::VectorSearcher;
pub use writer::VectorIndexWriter;

pub const DEFAULT_TABLE: &str = "chunks";
