//! Lightweight configuration loader and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars.
//! Nested keys are separated by `__` in env vars, e.g.
//! `APP_RETRIEVAL__TOP_K=5`.
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::chunker::ChunkingConfig;
use crate::types::{Modality, ScoreNormalization};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        Ok(Self { figment })
    }

    /// Build from an in-memory TOML document only. No files, no env.
    pub fn from_toml_str(toml: &str) -> Self {
        Self { figment: Figment::new().merge(Toml::string(toml)) }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Typed view of the whole configuration, with defaults for anything missing.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to read settings: {}", e))?;
        settings.validate()?;
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
    pub models: ModelSettings,
    pub llm: LlmSettings,
    pub persona: Option<String>,
}

impl Settings {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.chunking.pdf.validate()?;
        self.chunking.excel.validate()?;
        self.chunking.default.validate()?;
        if self.retrieval.top_k == 0 {
            anyhow::bail!("retrieval.top_k must be positive");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub index_dir: String,
    /// Files above this size are rejected by the loader.
    pub max_file_size: u64,
    /// Row cap per worksheet when flattening spreadsheets.
    pub max_sheet_rows: usize,
    /// Row cap per worksheet when loading spreadsheets as SQL tables.
    pub max_sql_rows: usize,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            index_dir: "./indexes".into(),
            max_file_size: 50 * 1024 * 1024,
            max_sheet_rows: 2000,
            max_sql_rows: 100_000,
        }
    }
}

impl DataSettings {
    pub fn index_path(&self) -> PathBuf {
        expand_path(&self.index_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    pub pdf: ChunkingConfig,
    pub excel: ChunkingConfig,
    pub default: ChunkingConfig,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            pdf: ChunkingConfig::PDF,
            excel: ChunkingConfig::EXCEL,
            default: ChunkingConfig::PDF,
        }
    }
}

impl ChunkingSettings {
    pub fn for_modality(&self, modality: Modality) -> ChunkingConfig {
        match modality {
            Modality::Pdf => self.pdf,
            Modality::Excel => self.excel,
            Modality::Docx | Modality::Pptx | Modality::Text => self.default,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub k_dense: usize,
    pub k_bm25: usize,
    pub top_k: usize,
    pub normalization: ScoreNormalization,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { k_dense: 30, k_bm25: 30, top_k: 8, normalization: ScoreNormalization::MinMax }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    /// Directory with `config.json`, `tokenizer.json` and weights of the sentence encoder.
    pub embedding_dir: String,
    /// Same layout for the cross-encoder.
    pub reranker_dir: String,
    pub use_fake: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            embedding_dir: "./models/all-MiniLM-L6-v2".into(),
            reranker_dir: "./models/ms-marco-MiniLM-L-6-v2".into(),
            use_fake: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    OpenAi,
    Gemini,
    Mock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub provider: LlmProvider,
    pub model: String,
    /// Overrides the provider's default endpoint, e.g. a local llama.cpp server.
    pub base_url: Option<String>,
    /// Name of the environment variable holding the API key.
    pub api_key_env: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            provider: LlmProvider::Gemini,
            model: "gemini-1.5-flash".into(),
            base_url: None,
            api_key_env: None,
            temperature: 0.2,
            max_tokens: 1024,
            timeout_secs: 60,
        }
    }
}

impl LlmSettings {
    pub fn api_key_var(&self) -> &str {
        match (&self.api_key_env, self.provider) {
            (Some(var), _) => var,
            (None, LlmProvider::OpenAi) => "OPENAI_API_KEY",
            (None, LlmProvider::Gemini) => "GEMINI_API_KEY",
            (None, LlmProvider::Mock) => "MOCK_API_KEY",
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
