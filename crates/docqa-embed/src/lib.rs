mod cross_encoder;
mod device;
mod fake;
mod pool;
mod sentence;
mod tokenize;
mod weights;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use docqa_core::config::{expand_path, ModelSettings};
use docqa_core::traits::{Embedder, Reranker};

pub use cross_encoder::CrossEncoder;
pub use device::select_device;
pub use fake::{FakeEmbedder, FakeReranker};
pub use pool::masked_mean_l2;
pub use sentence::BertEmbedder;
pub use tokenize::{tokenize_on_device, Encoded};

/// Output size of all-MiniLM-L6-v2; the fake embedder mimics it.
pub const DEFAULT_DIM: usize = 384;

fn fake_requested() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

pub fn get_default_embedder(model_dir: &Path) -> Result<Arc<dyn Embedder>> {
    if fake_requested() {
        info!("using FakeEmbedder");
        return Ok(Arc::new(FakeEmbedder::new(DEFAULT_DIM)));
    }
    Ok(Arc::new(BertEmbedder::load(model_dir)?))
}

pub fn get_default_reranker(model_dir: &Path) -> Result<Arc<dyn Reranker>> {
    if fake_requested() {
        info!("using FakeReranker");
        return Ok(Arc::new(FakeReranker));
    }
    Ok(Arc::new(CrossEncoder::load(model_dir)?))
}

/// The embedding model and cross-encoder, loaded once and shared by the
/// index builder and the ranker.
#[derive(Clone)]
pub struct ModelServices {
    pub embedder: Arc<dyn Embedder>,
    pub reranker: Arc<dyn Reranker>,
}

impl ModelServices {
    pub fn new(embedder: Arc<dyn Embedder>, reranker: Arc<dyn Reranker>) -> Self {
        Self { embedder, reranker }
    }

    pub fn load(settings: &ModelSettings) -> Result<Self> {
        if settings.use_fake {
            info!("models.use_fake set; using fake models");
            return Ok(Self::fake());
        }
        let embedder = get_default_embedder(&expand_path(&settings.embedding_dir))?;
        let reranker = get_default_reranker(&expand_path(&settings.reranker_dir))?;
        Ok(Self { embedder, reranker })
    }

    pub fn fake() -> Self {
        Self { embedder: Arc::new(FakeEmbedder::new(DEFAULT_DIM)), reranker: Arc::new(FakeReranker) }
    }

    pub fn shutdown(self) {
        info!(
            embedder = %self.embedder.model_id(),
            reranker = %self.reranker.model_id(),
            "releasing models"
        );
    }
}
