use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use docqa_core::config::Settings;
use docqa_core::error::Error;
use docqa_core::processor::{DataProcessor, FileFailure};
use docqa_core::types::RetrievedPassage;
use docqa_embed::ModelServices;
use docqa_hybrid::{ChunkIndex, HybridOptions, HybridSearchEngine};
use docqa_llm::{AnyGenerator, TextGenerator};

use crate::composer::{Answer, AnswerComposer};
use crate::persona::Persona;
use crate::sql::{SqlAnswer, SqlAnswerer};
use crate::tables::ExcelTables;

#[derive(Debug, Clone)]
pub struct IngestReport {
    pub index_dir: PathBuf,
    pub files_total: usize,
    pub files_ok: usize,
    pub failures: Vec<FileFailure>,
    pub chunks: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResponse {
    pub passages: Vec<RetrievedPassage>,
    pub answer: Answer,
}

/// Ingest, search and ask against one index directory.
pub struct RagPipeline<G = AnyGenerator> {
    settings: Settings,
    models: ModelServices,
    composer: AnswerComposer<G>,
}

impl RagPipeline<AnyGenerator> {
    /// Loads the configured models and text generator.
    pub fn from_settings(settings: Settings) -> Result<Self> {
        let models = ModelServices::load(&settings.models)?;
        let generator = AnyGenerator::from_settings(&settings.llm)?;
        Ok(Self::new(settings, models, generator))
    }
}

impl<G: TextGenerator> RagPipeline<G> {
    pub fn new(settings: Settings, models: ModelServices, generator: G) -> Self {
        Self { settings, models, composer: AnswerComposer::new(generator) }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn models(&self) -> &ModelServices {
        &self.models
    }

    pub fn composer(&self) -> &AnswerComposer<G> {
        &self.composer
    }

    pub fn index_dir(&self) -> PathBuf {
        self.settings.data.index_path()
    }

    /// Persona from configuration, falling back to the general one.
    pub fn default_persona(&self) -> Result<Persona> {
        match self.settings.persona.as_deref() {
            Some(name) => Ok(name.parse()?),
            None => Ok(Persona::default()),
        }
    }

    /// Loads and chunks `paths` and replaces the index with the result.
    /// Fails only when files were found and none of them could be loaded.
    pub async fn ingest(&self, paths: &[PathBuf]) -> Result<IngestReport> {
        let started = Instant::now();
        let processor = DataProcessor::with_settings(&self.settings.data, self.settings.chunking.clone());
        let outcome = processor.process_paths(paths);
        if outcome.files_total() > 0 && outcome.files_ok == 0 {
            return Err(Error::AllInputsFailed(outcome.failures.len()).into());
        }

        let index_dir = self.index_dir();
        let index = ChunkIndex::build(&index_dir, &outcome.chunks, self.models.embedder.as_ref()).await?;
        info!(
            chunks = index.len(),
            files = outcome.files_ok,
            failed = outcome.failures.len(),
            elapsed_ms = started.elapsed().as_millis(),
            "ingest complete"
        );
        Ok(IngestReport {
            index_dir,
            files_total: outcome.files_total(),
            files_ok: outcome.files_ok,
            failures: outcome.failures,
            chunks: index.len(),
        })
    }

    /// Opens the persisted index. Missing artifacts yield [`Error::NoIndex`].
    pub async fn open_engine(&self) -> Result<HybridSearchEngine> {
        let index = ChunkIndex::open(&self.index_dir(), self.models.embedder.as_ref()).await?;
        Ok(HybridSearchEngine::new(index, self.models.clone(), HybridOptions::from(&self.settings.retrieval)))
    }

    pub async fn search(&self, question: &str, top_k: usize) -> Result<Vec<RetrievedPassage>> {
        let engine = self.open_engine().await?;
        let passages = engine.search(question, top_k).await?;
        info!(results = passages.len(), top_k, "search complete");
        Ok(passages)
    }

    pub async fn ask(&self, question: &str, persona: Persona, top_k: usize) -> Result<QueryResponse> {
        let passages = self.search(question, top_k).await?;
        let answer = self.composer.compose(question, &passages, persona).await;
        info!(status = ?answer.status, citations = answer.citations.len(), %persona, "answer composed");
        Ok(QueryResponse { passages, answer })
    }

    /// Answers from the `.xlsx` workbooks among `inputs` by generating and
    /// running SQL over their sheets. Independent of the retrieval index.
    pub async fn ask_sql(&self, question: &str, persona: Persona, inputs: &[PathBuf]) -> Result<SqlAnswer> {
        let tables = ExcelTables::load(inputs, &self.settings.data)?;
        let answer = SqlAnswerer::new(self.composer.generator()).answer(&tables, question, persona).await;
        info!(status = ?answer.status, tables = tables.tables().len(), %persona, "SQL answer composed");
        Ok(answer)
    }

    pub fn shutdown(self) {
        self.models.shutdown();
    }
}
