//! Answers questions about spreadsheets by having the model write SQL,
//! running it over [`ExcelTables`] and summarizing the result.

use serde::Serialize;
use tracing::{debug, warn};

use docqa_llm::{Prompt, TextGenerator};

use crate::persona::Persona;
use crate::tables::{ExcelTables, QueryResult};

/// Rows of the result shown to the model when summarizing.
const SUMMARY_ROWS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SqlAnswerStatus {
    Answered,
    /// The generated SQL did not run; `sql` holds it for the user to correct.
    SqlFailed,
    /// Writing the query or the summary failed; `text` holds the reason.
    GenerationFailed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlAnswer {
    pub status: SqlAnswerStatus,
    pub text: String,
    pub sql: Option<String>,
    pub result: Option<QueryResult>,
    /// Workbooks the tables came from.
    pub sources: Vec<String>,
}

pub fn sql_prompt(question: &str, tables: &ExcelTables, persona: Persona) -> Prompt {
    let system = format!(
        "{} You must first output ONLY a valid SQLite SQL query to answer the user's question, no commentary. \
         Avoid backticks and code fences.",
        persona.description()
    );
    let user = format!(
        "Return ONLY a valid SQLite SQL that answers the question. Available tables and sample schemas:\n{}\n\n\
         Question: {question}\nSQL:",
        tables.describe()
    );
    Prompt::new(system, user)
}

pub fn summary_prompt(sql: &str, result: &QueryResult, persona: Persona) -> Prompt {
    let user = format!(
        "Explain the SQL result briefly for the intended audience.\nSQL:\n{sql}\n\nSample rows:\n{}",
        result.to_markdown(SUMMARY_ROWS)
    );
    Prompt::new(persona.description(), user)
}

/// Strips code fences and a leading `sql` / `SQL:` marker from model output.
pub fn clean_sql(raw: &str) -> String {
    let mut sql = raw.trim();
    if let Some(rest) = sql.strip_prefix("```") {
        sql = rest.trim_end().strip_suffix("```").unwrap_or(rest).trim();
    }
    if sql.get(..3).is_some_and(|p| p.eq_ignore_ascii_case("sql")) {
        sql = sql[3..].trim_start_matches(':').trim();
    }
    sql.to_string()
}

pub struct SqlAnswerer<G> {
    generator: G,
}

impl<G: TextGenerator> SqlAnswerer<G> {
    pub fn new(generator: G) -> Self {
        Self { generator }
    }

    /// One query attempt: a failing statement is reported with its text, never retried.
    pub async fn answer(&self, tables: &ExcelTables, question: &str, persona: Persona) -> SqlAnswer {
        let sources = tables.sources();
        let failed = |status: SqlAnswerStatus, text: String, sql: Option<String>, result: Option<QueryResult>| SqlAnswer {
            status,
            text,
            sql,
            result,
            sources: sources.clone(),
        };

        let raw = match self.generator.generate(&sql_prompt(question, tables, persona)).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(generator = self.generator.name(), error = %e, "SQL generation failed");
                let text = format!("SQL generation failed ({}): {e}", self.generator.name());
                return failed(SqlAnswerStatus::GenerationFailed, text, None, None);
            }
        };
        let sql = clean_sql(&raw);
        debug!(%sql, "generated SQL");

        let outcome = if sql.is_empty() { Err(anyhow::anyhow!("the model returned no SQL")) } else { tables.query(&sql) };
        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!(%sql, error = %e, "generated SQL failed");
                let text = format!("SQL execution failed: {e}\n\nGenerated SQL:\n{sql}");
                return failed(SqlAnswerStatus::SqlFailed, text, Some(sql), None);
            }
        };

        match self.generator.generate(&summary_prompt(&sql, &result, persona)).await {
            Ok(summary) => SqlAnswer {
                status: SqlAnswerStatus::Answered,
                text: summary,
                sql: Some(sql),
                result: Some(result),
                sources: sources.clone(),
            },
            Err(e) => {
                warn!(generator = self.generator.name(), error = %e, "result summary failed");
                let text = format!("Summary generation failed ({}): {e}", self.generator.name());
                failed(SqlAnswerStatus::GenerationFailed, text, Some(sql), Some(result))
            }
        }
    }
}
