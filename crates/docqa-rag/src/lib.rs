//! docqa-rag
//!
//! Document question answering on top of the hybrid index: ingestion into a
//! persisted index, ranked passage search and persona-aware cited answers,
//! plus SQL answers over spreadsheet tables.
pub mod composer;
pub mod persona;
pub mod pipeline;
pub mod sql;
pub mod tables;

pub use composer::{build_prompt, citations, format_context, Answer, AnswerComposer, AnswerStatus};
pub use persona::{Persona, NOT_FOUND_ANSWER};
pub use pipeline::{IngestReport, QueryResponse, RagPipeline};
pub use sql::{clean_sql, SqlAnswer, SqlAnswerStatus, SqlAnswerer};
pub use tables::{ExcelTables, QueryResult, TableInfo};
