use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use anyhow::Result;
use twox_hash::XxHash64;

use docqa_core::traits::{Embedder, Reranker};

/// Deterministic hashing embedder for tests and offline runs. Texts sharing
/// tokens get similar vectors; no model files needed.
pub struct FakeEmbedder {
    dim: usize,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self { Self { dim } }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = ((h >> 32) as u32) as f32 / u32::MAX as f32;
            v[idx] += 0.5 + val + (i as f32 % 3.0) * 0.01;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

impl Embedder for FakeEmbedder {
    fn model_id(&self) -> String { format!("fake-hash-{}", self.dim) }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { usize::MAX }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// Scores a passage by the share of distinct query terms it contains.
#[derive(Default)]
pub struct FakeReranker;

fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

impl Reranker for FakeReranker {
    fn model_id(&self) -> String { "fake-overlap".into() }

    fn score(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>> {
        let q = terms(query);
        if q.is_empty() {
            return Ok(vec![0.0; passages.len()]);
        }
        Ok(passages
            .iter()
            .map(|p| {
                let p = terms(p);
                q.intersection(&p).count() as f32 / q.len() as f32
            })
            .collect())
    }
}
