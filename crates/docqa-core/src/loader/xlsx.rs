//! Flattens an `.xlsx` workbook into a text block per sheet:
//!
//! ```text
//! ### File: budget.xlsx | Sheet: Q1
//! Columns: Item, Cost
//! Item,Cost
//! Pump,120
//! ```

use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::ZipArchive;

use super::ooxml::{open_package, read_part};
use crate::error::LoadError;

const FORMAT: &str = "Excel";

/// Columns in the widest sheet Excel allows (`A` through `XFD`).
pub const MAX_COLUMNS: usize = 16_384;

/// One worksheet: the first row as header, then at most `max_rows` data rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetTable {
    pub name: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Reads every worksheet of the workbook at `path`, in workbook order.
pub fn read_workbook(path: &Path, max_rows: usize) -> Result<Vec<SheetTable>, LoadError> {
    let mut archive = open_package(path, FORMAT)?;

    let shared = match read_part(&mut archive, "xl/sharedStrings.xml", FORMAT)? {
        Some(xml) => shared_strings(&xml)?,
        None => Vec::new(),
    };
    let sheets = sheet_parts(&mut archive)?;

    let mut tables = Vec::with_capacity(sheets.len());
    for (name, part) in sheets {
        let Some(xml) = read_part(&mut archive, &part, FORMAT)? else {
            continue;
        };
        let mut rows = sheet_rows(&xml, &shared, max_rows.saturating_add(1))?;
        let header = if rows.is_empty() { Vec::new() } else { rows.remove(0) };
        tables.push(SheetTable { name, header, rows });
    }
    Ok(tables)
}

pub(super) fn workbook_to_text(path: &Path, file_name: &str, max_rows: usize) -> Result<String, LoadError> {
    let mut out = Vec::new();
    for sheet in read_workbook(path, max_rows)? {
        out.push(format!("### File: {file_name} | Sheet: {}", sheet.name));
        out.push(format!("Columns: {}", sheet.header.join(", ")));
        let mut csv: Vec<String> = Vec::with_capacity(sheet.rows.len() + 1);
        if !sheet.header.is_empty() {
            csv.push(csv_line(&sheet.header));
        }
        csv.extend(sheet.rows.iter().map(|row| csv_line(row)));
        out.push(csv.join("\n"));
    }
    Ok(out.join("\n"))
}

/// (sheet name, zip part path) in workbook order.
fn sheet_parts<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Vec<(String, String)>, LoadError> {
    let workbook = read_part(archive, "xl/workbook.xml", FORMAT)?
        .ok_or_else(|| LoadError::parse(FORMAT, "missing xl/workbook.xml"))?;
    let rels = read_part(archive, "xl/_rels/workbook.xml.rels", FORMAT)?.unwrap_or_default();

    let mut targets = HashMap::new();
    for_each_element(&rels, |e| {
        if e.name().as_ref() == b"Relationship" {
            if let (Some(id), Some(target)) = (attr(e, b"Id"), attr(e, b"Target")) {
                targets.insert(id, target);
            }
        }
    })?;

    let mut sheets = Vec::new();
    let mut position = 0usize;
    for_each_element(&workbook, |e| {
        if e.name().as_ref() == b"sheet" {
            position += 1;
            let name = attr(e, b"name").unwrap_or_else(|| format!("Sheet{position}"));
            let part = attr(e, b"r:id")
                .and_then(|id| targets.get(&id).cloned())
                .map_or_else(|| format!("xl/worksheets/sheet{position}.xml"), |t| part_path(&t));
            sheets.push((name, part));
        }
    })?;
    Ok(sheets)
}

fn part_path(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{target}"),
    }
}

fn for_each_element(xml: &str, mut f: impl FnMut(&BytesStart<'_>)) -> Result<(), LoadError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e) | Event::Empty(e)) => f(&e),
            Ok(Event::Eof) => return Ok(()),
            Err(e) => return Err(LoadError::parse(FORMAT, e)),
            _ => {}
        }
    }
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .filter_map(Result::ok)
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

fn shared_strings(xml: &str) -> Result<Vec<String>, LoadError> {
    let mut reader = Reader::from_str(xml);
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_text = false;
    // Phonetic hints carry their own <t> runs that are not part of the value.
    let mut in_phonetic = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"si" => current.clear(),
                b"t" if !in_phonetic => in_text = true,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"t" => in_text = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Ok(Event::Text(t)) if in_text => {
                current.push_str(&t.unescape().map_err(|e| LoadError::parse(FORMAT, e))?);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(LoadError::parse(FORMAT, e)),
            _ => {}
        }
    }
    Ok(strings)
}

/// Zero-based column of a cell reference such as `AB12`; `None` when the
/// reference carries no column letters. Columns past `XFD` are rejected.
fn column_index(cell_ref: &str) -> Result<Option<usize>, LoadError> {
    let letters: Vec<u8> = cell_ref.bytes().take_while(u8::is_ascii_alphabetic).collect();
    if letters.is_empty() {
        return Ok(None);
    }
    let n = letters.iter().try_fold(0usize, |acc, b| {
        acc.checked_mul(26)?
            .checked_add(usize::from(b.to_ascii_uppercase() - b'A' + 1))
            .filter(|&n| n <= MAX_COLUMNS)
    });
    match n {
        Some(n) => Ok(Some(n - 1)),
        None => Err(LoadError::parse(FORMAT, format!("cell reference {cell_ref} is beyond column XFD"))),
    }
}

fn sheet_rows(xml: &str, shared: &[String], limit: usize) -> Result<Vec<Vec<String>>, LoadError> {
    let mut reader = Reader::from_str(xml);
    let mut rows = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell_type = String::new();
    let mut cell_col: Option<usize> = None;
    let mut value = String::new();
    let mut in_value = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"row" => row.clear(),
                b"c" => {
                    cell_type = attr(&e, b"t").unwrap_or_default();
                    cell_col = match attr(&e, b"r") {
                        Some(r) => column_index(&r)?,
                        None => None,
                    };
                    value.clear();
                }
                b"v" | b"t" => in_value = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"v" | b"t" => in_value = false,
                b"c" => {
                    let resolved = match cell_type.as_str() {
                        "s" => value
                            .trim()
                            .parse::<usize>()
                            .ok()
                            .and_then(|i| shared.get(i).cloned())
                            .unwrap_or_default(),
                        "b" => if value.trim() == "1" { "TRUE".into() } else { "FALSE".into() },
                        _ => value.clone(),
                    };
                    let col = cell_col.unwrap_or(row.len());
                    if col >= MAX_COLUMNS {
                        return Err(LoadError::parse(FORMAT, format!("row has more than {MAX_COLUMNS} cells")));
                    }
                    if row.len() <= col {
                        row.resize(col + 1, String::new());
                    }
                    row[col] = resolved;
                }
                b"row" => {
                    if rows.len() >= limit {
                        break;
                    }
                    rows.push(std::mem::take(&mut row));
                }
                _ => {}
            },
            Ok(Event::Text(t)) if in_value => {
                value.push_str(&t.unescape().map_err(|e| LoadError::parse(FORMAT, e))?);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(LoadError::parse(FORMAT, e)),
            _ => {}
        }
    }
    Ok(rows)
}

fn csv_line(fields: &[String]) -> String {
    fields
        .iter()
        .map(|f| {
            if f.contains([',', '"', '\n', '\r']) {
                format!("\"{}\"", f.replace('"', "\"\""))
            } else {
                f.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}
