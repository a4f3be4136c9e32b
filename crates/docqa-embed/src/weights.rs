use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use tokenizers::{Tokenizer, TruncationParams, TruncationStrategy};
use tracing::info;

/// Files of a Hugging Face style model directory.
pub struct ModelFiles {
    pub dir: PathBuf,
    pub config_json: String,
    pub tokenizer: Tokenizer,
}

impl ModelFiles {
    pub fn open(dir: &Path, max_len: usize) -> Result<Self> {
        if !dir.is_dir() {
            bail!("model directory not found: {}", dir.display());
        }
        let tokenizer_path = dir.join("tokenizer.json");
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_len,
                strategy: TruncationStrategy::LongestFirst,
                ..Default::default()
            }))
            .map_err(|e| anyhow!("Failed to configure truncation: {}", e))?;
        tokenizer.with_padding(None);

        let config_path = dir.join("config.json");
        let config_json = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow!("Failed to read {}: {}", config_path.display(), e))?;
        Ok(Self { dir: dir.to_path_buf(), config_json, tokenizer })
    }

    pub fn hidden_size(&self) -> Result<usize> {
        let value: serde_json::Value = serde_json::from_str(&self.config_json)?;
        value
            .get("hidden_size")
            .and_then(serde_json::Value::as_u64)
            .map(|h| h as usize)
            .ok_or_else(|| anyhow!("config.json has no hidden_size"))
    }

    /// Prefers `model.safetensors`, falls back to `pytorch_model.bin`.
    pub fn var_builder(&self, device: &Device) -> Result<VarBuilder<'static>> {
        let safetensors = self.dir.join("model.safetensors");
        let pickle = self.dir.join("pytorch_model.bin");
        let tensors: HashMap<String, Tensor> = if safetensors.exists() {
            info!(path = %safetensors.display(), "loading weights");
            candle_core::safetensors::load(&safetensors, device)?
        } else if pickle.exists() {
            info!(path = %pickle.display(), "loading weights");
            candle_core::pickle::read_all(&pickle)?.into_iter().collect()
        } else {
            bail!("no model.safetensors or pytorch_model.bin in {}", self.dir.display());
        };
        Ok(VarBuilder::from_tensors(tensors, DType::F32, device))
    }

    /// Directory name, used as the model identifier.
    pub fn model_id(&self) -> String {
        self.dir
            .file_name()
            .map_or_else(|| self.dir.display().to_string(), |n| n.to_string_lossy().into_owned())
    }
}
