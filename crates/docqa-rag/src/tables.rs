//! Spreadsheets loaded into an in-memory SQLite database, one table per sheet.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params_from_iter, Connection, Transaction};
use serde::Serialize;
use tracing::{debug, info, warn};

use docqa_core::config::DataSettings;
use docqa_core::error::{Error, LoadError};
use docqa_core::loader::{read_workbook, SheetTable};
use docqa_core::processor::{expand_inputs, FileFailure};
use docqa_core::types::Modality;

/// Most rows a query result keeps.
pub const MAX_RESULT_ROWS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableInfo {
    pub name: String,
    pub file_name: String,
    pub sheet: String,
    pub columns: Vec<String>,
}

impl TableInfo {
    /// `budget.xlsx :: Q1`
    pub fn origin(&self) -> String {
        format!("{} :: {}", self.file_name, self.sheet)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
    /// More than [`MAX_RESULT_ROWS`] rows matched.
    pub truncated: bool,
}

impl QueryResult {
    /// Markdown table of the first `limit` rows.
    pub fn to_markdown(&self, limit: usize) -> String {
        let line = |cells: &[String]| {
            let cells: Vec<String> = cells.iter().map(|c| c.replace('|', "\\|").replace('\n', " ")).collect();
            format!("| {} |", cells.join(" | "))
        };
        let mut out = vec![line(&self.columns), format!("|{}", " --- |".repeat(self.columns.len()))];
        out.extend(self.rows.iter().take(limit).map(|r| line(r)));
        out.join("\n")
    }
}

pub struct ExcelTables {
    conn: Connection,
    tables: Vec<TableInfo>,
    failures: Vec<FileFailure>,
}

impl ExcelTables {
    /// Loads every `.xlsx` among `inputs` (directories are walked). A workbook
    /// that cannot be read is skipped and recorded; loading fails only when no
    /// table could be created.
    pub fn load(inputs: &[PathBuf], data: &DataSettings) -> Result<Self> {
        let mut failures = Vec::new();
        let mut workbooks = Vec::new();
        for path in expand_inputs(inputs, &mut failures) {
            if Modality::from_path(&path) == Some(Modality::Excel) {
                workbooks.push(path);
            } else if inputs.contains(&path) {
                failures.push(FileFailure { path, error: "not an .xlsx workbook".into() });
            }
        }

        let mut conn = Connection::open_in_memory()?;
        let mut tables: Vec<TableInfo> = Vec::new();
        for path in &workbooks {
            match load_workbook(&mut conn, path, data, &tables) {
                Ok(loaded) => {
                    debug!(file = %path.display(), tables = loaded.len(), "loaded workbook");
                    tables.extend(loaded);
                }
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "skipping workbook");
                    failures.push(FileFailure { path: path.clone(), error: e.to_string() });
                }
            }
        }
        if tables.is_empty() {
            return Err(Error::NotFound("no readable .xlsx sheets among the inputs".into()).into());
        }
        info!(tables = tables.len(), failed = failures.len(), "loaded spreadsheet tables");
        Ok(Self { conn, tables, failures })
    }

    pub fn tables(&self) -> &[TableInfo] {
        &self.tables
    }

    pub fn failures(&self) -> &[FileFailure] {
        &self.failures
    }

    /// Sorted unique workbook file names.
    pub fn sources(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.iter().map(|t| t.file_name.clone()).collect();
        names.sort();
        names.dedup();
        names
    }

    /// One `Table <name> (from <file> :: <sheet>) Columns: ...` line per table.
    pub fn describe(&self) -> String {
        self.tables
            .iter()
            .map(|t| format!("Table {} (from {}) Columns: {}", t.name, t.origin(), t.columns.join(", ")))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Runs a single read-only statement.
    pub fn query(&self, sql: &str) -> Result<QueryResult> {
        let mut stmt = self.conn.prepare(sql)?;
        if !stmt.readonly() {
            bail!("only read-only queries are allowed");
        }
        let columns: Vec<String> = stmt.column_names().into_iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        let mut truncated = false;
        let mut cursor = stmt.query([])?;
        while let Some(row) = cursor.next()? {
            if rows.len() >= MAX_RESULT_ROWS {
                truncated = true;
                break;
            }
            let mut cells = Vec::with_capacity(columns.len());
            for i in 0..columns.len() {
                cells.push(display_value(row.get_ref(i)?));
            }
            rows.push(cells);
        }
        Ok(QueryResult { columns, rows, truncated })
    }
}

fn load_workbook(conn: &mut Connection, path: &Path, data: &DataSettings, taken: &[TableInfo]) -> Result<Vec<TableInfo>> {
    let size = fs::metadata(path)?.len();
    if size > data.max_file_size {
        return Err(LoadError::FileTooLarge { size, limit: data.max_file_size }.into());
    }
    let sheets = read_workbook(path, data.max_sql_rows)?;
    let file_name = path.file_name().map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();

    let tx = conn.transaction()?;
    let mut loaded: Vec<TableInfo> = Vec::new();
    for sheet in sheets {
        let columns = column_names(&sheet);
        if columns.is_empty() {
            continue;
        }
        let base = sanitize_table_name(&format!("{stem}__{}", sheet.name));
        let name = unique_name(&base, |n| taken.iter().chain(&loaded).any(|t| t.name.eq_ignore_ascii_case(n)));
        create_table(&tx, &name, &columns, &sheet.rows)?;
        loaded.push(TableInfo { name, file_name: file_name.clone(), sheet: sheet.name, columns });
    }
    tx.commit()?;
    Ok(loaded)
}

/// Runs of characters outside `[0-9A-Za-z_]` become `_`; a leading digit gets a `t_` prefix.
pub fn sanitize_table_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    if out.is_empty() {
        out.push_str("sheet");
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert_str(0, "t_");
    }
    out
}

fn unique_name(base: &str, is_taken: impl Fn(&str) -> bool) -> String {
    if !is_taken(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}_{n}"))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Header cells as column names; blanks become `column_<n>` and repeats get a suffix.
fn column_names(sheet: &SheetTable) -> Vec<String> {
    let width = sheet.rows.iter().map(Vec::len).chain([sheet.header.len()]).max().unwrap_or(0);
    let mut names: Vec<String> = Vec::with_capacity(width);
    for i in 0..width {
        let base = sheet
            .header
            .get(i)
            .map(|h| h.trim())
            .filter(|h| !h.is_empty())
            .map_or_else(|| format!("column_{}", i + 1), str::to_string);
        let name = unique_name(&base, |n| names.iter().any(|existing| existing.eq_ignore_ascii_case(n)));
        names.push(name);
    }
    names
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn create_table(tx: &Transaction<'_>, name: &str, columns: &[String], rows: &[Vec<String>]) -> Result<()> {
    // Untyped columns keep each value's own storage class, so numbers compare and sum as numbers.
    let column_list: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    tx.execute_batch(&format!("CREATE TABLE {} ({});", quote_ident(name), column_list.join(", ")))?;

    let placeholders = vec!["?"; columns.len()].join(", ");
    let mut insert = tx.prepare(&format!("INSERT INTO {} VALUES ({placeholders})", quote_ident(name)))?;
    for row in rows {
        insert.execute(params_from_iter((0..columns.len()).map(|i| cell_value(row.get(i)))))?;
    }
    Ok(())
}

fn cell_value(cell: Option<&String>) -> Value {
    let Some(raw) = cell else { return Value::Null };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        Value::Null
    } else if let Ok(i) = trimmed.parse::<i64>() {
        Value::Integer(i)
    } else if let Some(f) = trimmed.parse::<f64>().ok().filter(|f| f.is_finite()) {
        Value::Real(f)
    } else {
        Value::Text(raw.clone())
    }
}

fn display_value(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => format!("<{} bytes>", b.len()),
    }
}
