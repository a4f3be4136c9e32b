use std::path::Path;

use anyhow::Result;
use candle_core::{Device, Module};
use candle_nn::{linear, Linear};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::info;

use docqa_core::traits::Reranker;

use crate::device::select_device;
use crate::tokenize::tokenize_on_device;
use crate::weights::ModelFiles;

pub const DEFAULT_MAX_LEN: usize = 512;

/// BERT sequence classifier scoring a (query, passage) pair jointly
/// (ms-marco-MiniLM-L-6-v2 layout). Logits are squashed with a sigmoid.
pub struct CrossEncoder {
    bert: BertModel,
    pooler: Linear,
    classifier: Linear,
    tokenizer: Tokenizer,
    device: Device,
    max_len: usize,
    model_id: String,
}

impl CrossEncoder {
    pub fn load(model_dir: &Path) -> Result<Self> {
        let device = select_device();
        info!(dir = %model_dir.display(), "loading cross-encoder");
        let files = ModelFiles::open(model_dir, DEFAULT_MAX_LEN)?;
        let config: BertConfig = serde_json::from_str(&files.config_json)?;
        let hidden = files.hidden_size()?;
        let vb = files.var_builder(&device)?;
        let bert = BertModel::load(vb.pp("bert"), &config)?;
        let pooler = linear(hidden, hidden, vb.pp("bert.pooler.dense"))?;
        let classifier = linear(hidden, 1, vb.pp("classifier"))?;
        info!("cross-encoder ready");
        Ok(Self {
            bert,
            pooler,
            classifier,
            tokenizer: files.tokenizer.clone(),
            device,
            max_len: DEFAULT_MAX_LEN,
            model_id: files.model_id(),
        })
    }

    pub fn score_pair(&self, query: &str, passage: &str) -> Result<f32> {
        let enc = tokenize_on_device(&self.tokenizer, (query, passage), self.max_len, &self.device)?;
        let hidden = self.bert.forward(&enc.input_ids, &enc.token_type_ids, Some(&enc.attention_mask))?;
        let cls = hidden.narrow(1, 0, 1)?.squeeze(1)?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        let logit = self.classifier.forward(&pooled)?;
        let prob = candle_nn::ops::sigmoid(&logit)?;
        let value: Vec<f32> = prob.to_device(&Device::Cpu)?.flatten_all()?.to_vec1()?;
        value.first().copied().ok_or_else(|| anyhow::anyhow!("empty classifier output"))
    }
}

impl Reranker for CrossEncoder {
    fn model_id(&self) -> String { self.model_id.clone() }

    fn score(&self, query: &str, passages: &[&str]) -> Result<Vec<f32>> {
        passages.iter().map(|p| self.score_pair(query, p)).collect()
    }
}
