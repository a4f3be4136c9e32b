use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use candle_core::Device;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use docqa_core::traits::Embedder;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_on_device;
use crate::weights::ModelFiles;

pub const DEFAULT_MAX_LEN: usize = 256;

/// BERT sentence encoder (all-MiniLM-L6-v2 layout) with mean pooling.
pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
    model_id: String,
}

impl BertEmbedder {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        info!(dir = %model_dir.display(), "loading sentence embedding model");
        let files = ModelFiles::open(model_dir, DEFAULT_MAX_LEN)?;
        let config: BertConfig = serde_json::from_str(&files.config_json)?;
        let dim = files.hidden_size()?;
        let vb = files.var_builder(&device)?;
        let model = BertModel::load(vb, &config)?;
        info!(dim, "sentence embedding model ready");
        Ok(Self { model, tokenizer: files.tokenizer.clone(), device, dim, max_len: DEFAULT_MAX_LEN, model_id: files.model_id() })
    }

    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let enc = tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let hidden = self.model.forward(&enc.input_ids, &enc.token_type_ids, Some(&enc.attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &enc.attention_mask)?;
        let emb: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        anyhow::ensure!(emb.len() == self.dim, "embedding has {} dims, expected {}", emb.len(), self.dim);
        if start.elapsed().as_millis() > 100 {
            debug!(ms = start.elapsed().as_millis(), "slow embedding");
        }
        Ok(emb)
    }
}

impl Embedder for BertEmbedder {
    fn model_id(&self) -> String { self.model_id.clone() }
    fn dim(&self) -> usize { self.dim }
    fn max_len(&self) -> usize { self.max_len }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_text(t)).collect()
    }
}
