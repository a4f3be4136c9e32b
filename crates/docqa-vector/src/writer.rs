use anyhow::{ensure, Result};
use arrow_array::{FixedSizeListArray, Int64Array, RecordBatch, RecordBatchIterator};
use indicatif::{ProgressBar, ProgressStyle};
use lancedb::Connection;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use docqa_core::traits::Embedder;

use crate::schema::build_arrow_schema;
use crate::table::open_db;

const EMBED_BATCH: usize = 32;

/// Embeds chunk texts and writes them as `(position, vector)` rows.
pub struct VectorIndexWriter {
	db: Connection,
	dir: PathBuf,
	table_name: String,
}

impl VectorIndexWriter {
	/// Opens a fresh database at `db_path`, removing any previous contents.
	pub async fn create(db_path: &Path, table_name: &str) -> Result<Self> {
		if db_path.exists() { std::fs::remove_dir_all(db_path)?; }
		std::fs::create_dir_all(db_path)?;
		let db = open_db(db_path).await?;
		Ok(Self { db, dir: db_path.to_path_buf(), table_name: table_name.to_string() })
	}

	/// Embeds `texts` (position = slice index) and stores them. Nothing is
	/// written for an empty slice. Returns the number of rows written.
	pub async fn write(&self, embedder: &dyn Embedder, texts: &[String]) -> Result<usize> {
		if texts.is_empty() {
			info!("no chunks to embed; vector table not created");
			return Ok(0);
		}
		let dim = embedder.dim();
		info!(chunks = texts.len(), dim, table = %self.table_name, "embedding chunks");
		let pb = ProgressBar::new(texts.len() as u64);
		if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}") {
			pb.set_style(style.progress_chars("#>-"));
		}

		let mut created = false;
		for (batch_index, batch) in texts.chunks(EMBED_BATCH).enumerate() {
			let embeddings = embedder.embed_batch(batch)?;
			ensure!(embeddings.len() == batch.len(), "embedder returned {} vectors for {} texts", embeddings.len(), batch.len());
			let first = batch_index * EMBED_BATCH;
			let record_batch = to_record_batch(first, &embeddings, dim)?;
			self.insert_batch(record_batch, created).await?;
			created = true;
			pb.inc(batch.len() as u64);
		}
		pb.finish_with_message("embedded");
		info!(rows = texts.len(), dir = %self.dir.display(), "vector index written");
		Ok(texts.len())
	}

	async fn insert_batch(&self, record_batch: RecordBatch, table_exists: bool) -> Result<()> {
		let schema = record_batch.schema();
		let reader = Box::new(RecordBatchIterator::new(vec![Ok(record_batch)].into_iter(), schema));
		if table_exists {
			self.db.open_table(&self.table_name).execute().await?.add(reader).execute().await?;
		} else {
			self.db.create_table(&self.table_name, reader).execute().await?;
		}
		Ok(())
	}
}

fn to_record_batch(first_position: usize, embeddings: &[Vec<f32>], dim: usize) -> Result<RecordBatch> {
	let dim_i32 = i32::try_from(dim)?;
	let mut positions = Vec::with_capacity(embeddings.len());
	let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(embeddings.len());
	for (offset, emb) in embeddings.iter().enumerate() {
		ensure!(emb.len() == dim, "embedding {} has {} dims, expected {}", first_position + offset, emb.len(), dim);
		positions.push(i64::try_from(first_position + offset)?);
		vectors.push(Some(emb.iter().map(|&x| Some(x)).collect()));
	}
	let record_batch = RecordBatch::try_new(build_arrow_schema(dim_i32), vec![
		Arc::new(Int64Array::from(positions)),
		Arc::new(FixedSizeListArray::from_iter_primitive::<arrow_array::types::Float32Type, _, _>(vectors.into_iter(), dim_i32)),
	])?;
	Ok(record_batch)
}
