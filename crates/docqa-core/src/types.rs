//! Domain types shared by the loaders, indexes and the ranker.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::Path;

/// Input format family of a document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Pdf,
    Excel,
    Docx,
    Pptx,
    Text,
}

impl Modality {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "xlsx" => Some(Self::Excel),
            "docx" => Some(Self::Docx),
            "pptx" => Some(Self::Pptx),
            "txt" | "md" => Some(Self::Text),
            _ => None,
        }
    }

    /// Label used inside source labels, e.g. `manual.pdf (PDF)`.
    pub fn label(self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Excel => "Excel",
            Self::Docx => "DOCX",
            Self::Pptx => "PPTX",
            Self::Text => "Text",
        }
    }
}

/// Contiguous run of words from one document. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub doc_name: String,
    pub modality: Modality,
}

impl Chunk {
    pub fn source_label(&self) -> String {
        format!("{} ({})", self.doc_name, self.modality.label())
    }
}

/// Document name part of a source label: `"a.pdf (PDF)"` -> `"a.pdf"`.
pub fn doc_name_of(label: &str) -> &str {
    label.rsplit_once(" (").map_or(label, |(name, _)| name)
}

/// Indicates which stage produced a score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SourceKind {
    Vector,
    Text,
    Fused,
    CrossEncoder,
}

/// A scored reference to a chunk by its position in the index.
///
/// `score` is stage-specific but higher is always better.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub position: usize,
    pub score: f32,
    pub source: SourceKind,
}

impl SearchHit {
    pub fn new(position: usize, score: f32, source: SourceKind) -> Self {
        Self { position, score, source }
    }
}

/// Descending score, ascending position on ties. A total order: NaN scores
/// rank below every number.
pub fn rank_order(a: &SearchHit, b: &SearchHit) -> Ordering {
    rank_key(b.score).total_cmp(&rank_key(a.score)).then(a.position.cmp(&b.position))
}

fn rank_key(score: f32) -> f32 {
    if score.is_nan() { f32::NEG_INFINITY } else { score }
}

pub fn sort_hits(hits: &mut [SearchHit]) {
    hits.sort_by(rank_order);
}

/// How dense and lexical scores are brought onto a common scale before the
/// max-merge.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScoreNormalization {
    /// Per-query min-max to `[0, 1]`. A list whose scores are all equal maps to `1.0`.
    MinMax,
    /// Divide each list by a constant.
    Scale { dense: f32, lexical: f32 },
}

impl Default for ScoreNormalization {
    fn default() -> Self {
        Self::MinMax
    }
}

impl ScoreNormalization {
    /// Dense scores untouched, BM25 divided by 100.
    pub const LEGACY: Self = Self::Scale { dense: 1.0, lexical: 100.0 };
}

/// A ranked chunk as handed to callers and to the answer composer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedPassage {
    pub position: usize,
    pub score: f32,
    pub source_label: String,
    pub text: String,
}

impl RetrievedPassage {
    pub fn doc_name(&self) -> &str {
        doc_name_of(&self.source_label)
    }
}
