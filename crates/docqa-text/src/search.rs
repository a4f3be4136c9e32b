use anyhow::Result;
use std::path::Path;
use tantivy::collector::TopDocs;
use tantivy::query::{BooleanQuery, Occur, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption, Value};
use tantivy::{Index, IndexReader, ReloadPolicy, TantivyDocument, Term};
use tracing::debug;

use docqa_core::types::{sort_hits, SearchHit, SourceKind};

use crate::tantivy_utils::{query_tokens, register_tokenizer, POSITION_FIELD, TEXT_FIELD};

/// Read-only BM25 scorer over a persisted lexical index.
pub struct Bm25Searcher {
	reader: IndexReader,
	position_field: Field,
	text_field: Field,
}

impl Bm25Searcher {
	pub fn open(index_dir: &Path) -> Result<Self> {
		let index = Index::open_in_dir(index_dir)?;
		register_tokenizer(&index);
		let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into()?;
		let schema = index.schema();
		let position_field = schema.get_field(POSITION_FIELD)?;
		let text_field = schema.get_field(TEXT_FIELD)?;
		Ok(Self { reader, position_field, text_field })
	}

	pub fn num_docs(&self) -> u64 {
		self.reader.searcher().num_docs()
	}

	/// Top `k` chunks sharing at least one token with `query`, best first.
	/// Equal scores are ordered by position.
	pub fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
		let tokens = query_tokens(query);
		if k == 0 || tokens.is_empty() {
			return Ok(Vec::new());
		}
		let clauses: Vec<(Occur, Box<dyn Query>)> = tokens
			.iter()
			.map(|t| {
				let term = Term::from_field_text(self.text_field, t);
				let q: Box<dyn Query> = Box::new(TermQuery::new(term, IndexRecordOption::WithFreqs));
				(Occur::Should, q)
			})
			.collect();
		let query = BooleanQuery::new(clauses);

		let searcher = self.reader.searcher();
		let top_docs = searcher.search(&query, &TopDocs::with_limit(k))?;
		let mut hits = Vec::with_capacity(top_docs.len());
		for (score, addr) in top_docs {
			let doc: TantivyDocument = searcher.doc(addr)?;
			if let Some(position) = doc.get_first(self.position_field).and_then(|v| v.as_u64()) {
				hits.push(SearchHit::new(position as usize, score, SourceKind::Text));
			}
		}
		sort_hits(&mut hits);
		debug!(tokens = tokens.len(), hits = hits.len(), "bm25 search");
		Ok(hits)
	}
}
