use tantivy::schema::{IndexRecordOption, Schema, TextFieldIndexing, TextOptions, FAST, INDEXED, STORED};
use tantivy::tokenizer::{RemoveLongFilter, TextAnalyzer, WhitespaceTokenizer};
use tantivy::Index;

pub const POSITION_FIELD: &str = "position";
pub const TEXT_FIELD: &str = "text";
pub const TOKENIZER_NAME: &str = "whitespace_exact";

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	let _position_field = schema_builder.add_u64_field(POSITION_FIELD, INDEXED | STORED | FAST);
	let text_field_indexing = TextFieldIndexing::default().set_tokenizer(TOKENIZER_NAME).set_index_option(IndexRecordOption::WithFreqs);
	let text_options = TextOptions::default().set_indexing_options(text_field_indexing);
	let _text_field = schema_builder.add_text_field(TEXT_FIELD, text_options);
	schema_builder.build()
}

/// Must be registered on every `Index` handle, both when writing and when searching.
pub fn register_tokenizer(index: &Index) {
	let tokenizer = TextAnalyzer::builder(WhitespaceTokenizer::default())
		.filter(RemoveLongFilter::limit(255))
		.build();
	index.tokenizers().register(TOKENIZER_NAME, tokenizer);
}

/// Query-side counterpart of the registered tokenizer.
pub fn query_tokens(query: &str) -> Vec<&str> {
	query.split_whitespace().filter(|t| t.len() < 255).collect()
}
