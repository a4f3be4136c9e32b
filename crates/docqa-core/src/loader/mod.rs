//! Raw text extraction from supported document formats.

mod ooxml;
mod xlsx;

pub use xlsx::{read_workbook, SheetTable, MAX_COLUMNS};

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::LoadError;
use crate::types::Modality;

/// Extracted text of one input file, before chunking.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub path: PathBuf,
    pub doc_name: String,
    pub modality: Modality,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct DocumentLoader {
    max_file_size: u64,
    max_sheet_rows: usize,
}

impl Default for DocumentLoader {
    fn default() -> Self {
        Self { max_file_size: 50 * 1024 * 1024, max_sheet_rows: 2000 }
    }
}

impl DocumentLoader {
    pub fn new(max_file_size: u64, max_sheet_rows: usize) -> Self {
        Self { max_file_size, max_sheet_rows }
    }

    pub fn is_supported(path: &Path) -> bool {
        Modality::from_path(path).is_some()
    }

    pub fn load(&self, path: &Path) -> Result<LoadedDocument, LoadError> {
        let modality = Modality::from_path(path).ok_or_else(|| {
            LoadError::UnsupportedFormat(
                path.extension()
                    .map_or_else(|| path.display().to_string(), |e| e.to_string_lossy().into_owned()),
            )
        })?;

        let size = fs::metadata(path)?.len();
        if size > self.max_file_size {
            return Err(LoadError::FileTooLarge { size, limit: self.max_file_size });
        }

        let doc_name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

        let text = match modality {
            Modality::Pdf => pdf_text(path)?,
            Modality::Excel => xlsx::workbook_to_text(path, &doc_name, self.max_sheet_rows)?,
            Modality::Docx => ooxml::docx_text(path)?,
            Modality::Pptx => ooxml::pptx_text(path)?,
            Modality::Text => read_text_lossy(path)?,
        };

        Ok(LoadedDocument { path: path.to_path_buf(), doc_name, modality, text })
    }
}

fn pdf_text(path: &Path) -> Result<String, LoadError> {
    // pdf-extract panics on some malformed files.
    std::panic::catch_unwind(|| pdf_extract::extract_text(path))
        .map_err(|_| LoadError::parse("PDF", "text extraction panicked"))?
        .map_err(|e| LoadError::parse("PDF", e))
}

fn read_text_lossy(path: &Path) -> Result<String, LoadError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(_) => Ok(String::from_utf8_lossy(&fs::read(path)?).into_owned()),
    }
}
