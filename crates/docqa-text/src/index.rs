use anyhow::Result;
use std::path::{Path, PathBuf};
use tantivy::schema::Field;
use tantivy::{doc, Index, IndexWriter};
use tracing::info;

use crate::tantivy_utils::{build_schema, register_tokenizer, POSITION_FIELD, TEXT_FIELD};

/// Writes a fresh lexical index; one tantivy document per chunk, keyed by position.
pub struct Bm25Indexer {
	index: Index,
	dir: PathBuf,
	position_field: Field,
	text_field: Field,
}

impl Bm25Indexer {
	/// Creates an empty index at `index_dir`, replacing whatever was there.
	pub fn create(index_dir: &Path) -> Result<Self> {
		let schema = build_schema();
		if index_dir.exists() { std::fs::remove_dir_all(index_dir)?; }
		std::fs::create_dir_all(index_dir)?;
		let index = Index::create_in_dir(index_dir, schema.clone())?;
		register_tokenizer(&index);
		let position_field = schema.get_field(POSITION_FIELD)?;
		let text_field = schema.get_field(TEXT_FIELD)?;
		Ok(Self { index, dir: index_dir.to_path_buf(), position_field, text_field })
	}

	/// Indexes `texts` with `texts[i]` at position `i`. Returns the document count.
	pub fn index_texts<S: AsRef<str>>(self, texts: &[S]) -> Result<usize> {
		// Single indexing thread keeps doc ids in insertion order.
		let mut writer: IndexWriter = self.index.writer_with_num_threads(1, 50_000_000)?;
		for (position, text) in texts.iter().enumerate() {
			writer.add_document(doc!(
				self.position_field => position as u64,
				self.text_field => text.as_ref().to_string(),
			))?;
		}
		writer.commit()?;
		writer.wait_merging_threads()?;
		info!(docs = texts.len(), dir = %self.dir.display(), "lexical index written");
		Ok(texts.len())
	}
}
