use anyhow::{anyhow, Result};
use arrow_array::{Array, Float32Array, Int64Array, RecordBatch};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};
use std::path::Path;
use tracing::debug;

use docqa_core::traits::Embedder;
use docqa_core::types::{sort_hits, SearchHit, SourceKind};

use crate::schema::POSITION_COLUMN;
use crate::table::{open_db, open_table_if_exists};

/// Exact cosine search over a persisted vector table.
pub struct VectorSearcher {
	table: Option<Table>,
	rows: usize,
}

impl VectorSearcher {
	pub async fn open(db_path: &Path, table_name: &str) -> Result<Self> {
		let db = open_db(db_path).await?;
		let table = open_table_if_exists(&db, table_name).await?;
		let rows = match &table {
			Some(t) => t.count_rows(None).await?,
			None => 0,
		};
		Ok(Self { table, rows })
	}

	pub fn len(&self) -> usize { self.rows }

	pub fn is_empty(&self) -> bool { self.rows == 0 }

	/// Encodes `query` with `embedder` and returns the `k` most similar chunks.
	pub async fn search(&self, embedder: &dyn Embedder, query: &str, k: usize) -> Result<Vec<SearchHit>> {
		if k == 0 || self.is_empty() {
			return Ok(Vec::new());
		}
		let query_vec = embedder
			.embed_batch(&[query.to_string()])?
			.pop()
			.ok_or_else(|| anyhow!("embedder returned no vector for the query"))?;
		self.search_vec(&query_vec, k).await
	}

	/// Score is cosine similarity (`1 - cosine distance`), best first.
	pub async fn search_vec(&self, query_vec: &[f32], k: usize) -> Result<Vec<SearchHit>> {
		let Some(table) = &self.table else { return Ok(Vec::new()) };
		if k == 0 || self.rows == 0 {
			return Ok(Vec::new());
		}
		let mut stream = table
			.vector_search(query_vec.to_vec())?
			.distance_type(DistanceType::Cosine)
			.bypass_vector_index()
			.limit(k)
			.execute()
			.await?;
		let mut hits = Vec::new();
		while let Some(batch) = stream.try_next().await? {
			collect_hits(&batch, &mut hits)?;
		}
		sort_hits(&mut hits);
		hits.truncate(k);
		debug!(hits = hits.len(), "dense search");
		Ok(hits)
	}
}

fn collect_hits(batch: &RecordBatch, hits: &mut Vec<SearchHit>) -> Result<()> {
	let positions = batch
		.column_by_name(POSITION_COLUMN)
		.and_then(|c| c.as_any().downcast_ref::<Int64Array>())
		.ok_or_else(|| anyhow!("position column missing from search results"))?;
	let distances = batch
		.column_by_name("_distance")
		.and_then(|c| c.as_any().downcast_ref::<Float32Array>())
		.ok_or_else(|| anyhow!("_distance column missing from search results"))?;
	for i in 0..batch.num_rows() {
		if positions.is_null(i) || distances.is_null(i) {
			continue;
		}
		let position = usize::try_from(positions.value(i))?;
		hits.push(SearchHit::new(position, 1.0 - distances.value(i), SourceKind::Vector));
	}
	Ok(())
}
