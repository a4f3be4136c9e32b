use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use docqa_core::config::{DataSettings, Settings};
use docqa_core::error::Error;
use docqa_embed::ModelServices;
use docqa_llm::MockGenerator;
use docqa_rag::{clean_sql, ExcelTables, Persona, RagPipeline, SqlAnswerStatus, SqlAnswerer};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

const TABLE: &str = "Savings_Report__By_Team";

fn inline(cell: &str, text: &str) -> String {
    format!(r#"<c r="{cell}" t="inlineStr"><is><t>{text}</t></is></c>"#)
}

fn number(cell: &str, value: &str) -> String {
    format!(r#"<c r="{cell}"><v>{value}</v></c>"#)
}

/// Single-sheet workbook named "By Team" with a Team / Savings table.
fn write_savings_workbook(path: &Path) {
    let rows = [
        format!("{}{}", inline("A1", "Team"), inline("B1", "Savings")),
        format!("{}{}", inline("A2", "A"), number("B2", "100")),
        format!("{}{}", inline("A3", "B"), number("B3", "250")),
        format!("{}{}", inline("A4", "A"), number("B4", "50")),
    ];
    let sheet: String = rows
        .iter()
        .enumerate()
        .map(|(i, cells)| format!(r#"<row r="{}">{cells}</row>"#, i + 1))
        .collect();
    let parts = [
        (
            "xl/workbook.xml",
            r#"<workbook xmlns:r="r"><sheets><sheet name="By Team" sheetId="1" r:id="rId1"/></sheets></workbook>"#
                .to_string(),
        ),
        (
            "xl/_rels/workbook.xml.rels",
            r#"<Relationships><Relationship Id="rId1" Target="worksheets/sheet1.xml"/></Relationships>"#.to_string(),
        ),
        ("xl/worksheets/sheet1.xml", format!("<worksheet><sheetData>{sheet}</sheetData></worksheet>")),
    ];

    let mut zip = ZipWriter::new(fs::File::create(path).unwrap());
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, body) in parts {
        zip.start_file(name, options).unwrap();
        zip.write_all(body.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

fn savings(tmp: &TempDir) -> PathBuf {
    let path = tmp.path().join("Savings Report.xlsx");
    write_savings_workbook(&path);
    path
}

#[test]
fn sheets_become_queryable_tables() {
    let tmp = TempDir::new().unwrap();
    let tables = ExcelTables::load(&[savings(&tmp)], &DataSettings::default()).unwrap();

    assert_eq!(
        tables.describe(),
        format!("Table {TABLE} (from Savings Report.xlsx :: By Team) Columns: Team, Savings")
    );
    assert_eq!(tables.sources(), vec!["Savings Report.xlsx".to_string()]);

    let result = tables
        .query(&format!("SELECT Team, SUM(Savings) FROM {TABLE} GROUP BY Team ORDER BY Team"))
        .unwrap();
    assert_eq!(result.rows, vec![vec!["A".to_string(), "150".to_string()], vec!["B".to_string(), "250".to_string()]]);
    assert!(!result.truncated);
}

#[test]
fn only_read_only_statements_run() {
    let tmp = TempDir::new().unwrap();
    let tables = ExcelTables::load(&[savings(&tmp)], &DataSettings::default()).unwrap();
    assert!(tables.query(&format!("DELETE FROM {TABLE}")).is_err());
    assert_eq!(tables.query(&format!("SELECT COUNT(*) FROM {TABLE}")).unwrap().rows, vec![vec!["3".to_string()]]);
}

#[test]
fn unreadable_workbooks_are_skipped() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("sheets");
    fs::create_dir(&dir).unwrap();
    write_savings_workbook(&dir.join("good.xlsx"));
    fs::write(dir.join("broken.xlsx"), "not a zip").unwrap();
    let notes = tmp.path().join("notes.txt");
    fs::write(&notes, "plain text").unwrap();

    let tables = ExcelTables::load(&[dir, notes.clone()], &DataSettings::default()).unwrap();
    assert_eq!(tables.tables().len(), 1);
    assert_eq!(tables.tables()[0].name, "good__By_Team");
    assert_eq!(tables.failures().len(), 2);
    assert!(tables.failures().iter().any(|f| f.path == notes));
}

#[test]
fn no_workbooks_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let err = ExcelTables::load(&[tmp.path().to_path_buf()], &DataSettings::default()).err().unwrap();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NotFound(_))));
}

#[test]
fn fences_and_markers_are_stripped() {
    assert_eq!(clean_sql("```sql\nSELECT 1;\n```"), "SELECT 1;");
    assert_eq!(clean_sql("SQL: SELECT 2"), "SELECT 2");
    assert_eq!(clean_sql("sql\nSELECT 3"), "SELECT 3");
    assert_eq!(clean_sql("  SELECT 4  "), "SELECT 4");
}

#[tokio::test]
async fn query_result_is_summarized_for_the_persona() {
    let tmp = TempDir::new().unwrap();
    let tables = ExcelTables::load(&[savings(&tmp)], &DataSettings::default()).unwrap();
    let generator = MockGenerator::with_responses(vec![
        format!("```sql\nSELECT Team, SUM(Savings) AS total FROM {TABLE} GROUP BY Team ORDER BY total DESC\n```"),
        "Team B saved the most.".into(),
    ]);
    let answerer = SqlAnswerer::new(&generator);

    let answer = answerer.answer(&tables, "Which team saved most?", Persona::CorporateEmployee).await;

    assert_eq!(answer.status, SqlAnswerStatus::Answered);
    assert_eq!(answer.text, "Team B saved the most.");
    assert_eq!(
        answer.sql.as_deref(),
        Some(format!("SELECT Team, SUM(Savings) AS total FROM {TABLE} GROUP BY Team ORDER BY total DESC").as_str())
    );
    let result = answer.result.unwrap();
    assert_eq!(result.columns, vec!["Team", "total"]);
    assert_eq!(result.rows[0], vec!["B", "250"]);
    assert_eq!(answer.sources, vec!["Savings Report.xlsx".to_string()]);

    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[0].user.contains(&format!("Table {TABLE}")));
    assert!(prompts[0].user.ends_with("Question: Which team saved most?\nSQL:"));
    assert!(prompts[0].system.starts_with(Persona::CorporateEmployee.description()));
    assert!(prompts[1].user.contains("| B | 250 |"));
    assert_eq!(prompts[1].system, Persona::CorporateEmployee.description());
}

#[tokio::test]
async fn malformed_sql_is_shown_back_without_retry() {
    let tmp = TempDir::new().unwrap();
    let tables = ExcelTables::load(&[savings(&tmp)], &DataSettings::default()).unwrap();
    let generator = MockGenerator::with_responses(vec!["SELEC Team FROM nowhere".into()]);

    let answer = SqlAnswerer::new(&generator).answer(&tables, "q", Persona::default()).await;

    assert_eq!(answer.status, SqlAnswerStatus::SqlFailed);
    assert_eq!(answer.sql.as_deref(), Some("SELEC Team FROM nowhere"));
    assert!(answer.text.starts_with("SQL execution failed:"), "{}", answer.text);
    assert!(answer.text.ends_with("Generated SQL:\nSELEC Team FROM nowhere"));
    assert!(answer.result.is_none());
    assert_eq!(generator.prompts().len(), 1);
}

#[tokio::test]
async fn generation_failure_is_reported() {
    let tmp = TempDir::new().unwrap();
    let tables = ExcelTables::load(&[savings(&tmp)], &DataSettings::default()).unwrap();
    let answer = SqlAnswerer::new(MockGenerator::failing()).answer(&tables, "q", Persona::default()).await;
    assert_eq!(answer.status, SqlAnswerStatus::GenerationFailed);
    assert!(answer.sql.is_none());
    assert!(answer.text.contains("mock LLM error"));
}

#[tokio::test]
async fn pipeline_answers_from_workbooks_without_an_index() {
    let tmp = TempDir::new().unwrap();
    let mut settings = Settings::default();
    settings.data.index_dir = tmp.path().join("index").to_string_lossy().into_owned();
    let generator = MockGenerator::with_responses(vec![
        format!("SELECT SUM(Savings) FROM {TABLE}"),
        "Total savings are 400.".into(),
    ]);
    let rag = RagPipeline::new(settings, ModelServices::fake(), generator);

    let answer = rag.ask_sql("Total savings?", Persona::GeneralEmployee, &[savings(&tmp)]).await.unwrap();
    assert_eq!(answer.status, SqlAnswerStatus::Answered);
    assert_eq!(answer.result.unwrap().rows, vec![vec!["400".to_string()]]);
    assert_eq!(answer.text, "Total savings are 400.");
}
