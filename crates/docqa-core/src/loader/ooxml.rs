//! Shared helpers for Office Open XML packages (zip archives of XML parts).

use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::LoadError;

pub(super) fn open_package(path: &Path, format: &'static str) -> Result<ZipArchive<File>, LoadError> {
    let file = File::open(path)?;
    ZipArchive::new(file).map_err(|e| LoadError::parse(format, e))
}

/// Read a part as UTF-8. A missing part is `Ok(None)`.
pub(super) fn read_part<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    name: &str,
    format: &'static str,
) -> Result<Option<String>, LoadError> {
    let mut entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(LoadError::parse(format, e)),
    };
    let mut xml = String::new();
    entry.read_to_string(&mut xml)?;
    Ok(Some(xml))
}

/// Concatenate the text of every `run` element, one output line per `para` element.
pub(super) fn text_runs(xml: &str, run: &[u8], para: &[u8], format: &'static str) -> Result<String, LoadError> {
    let mut reader = Reader::from_str(xml);
    let mut lines: Vec<String> = Vec::new();
    let mut line = String::new();
    let mut in_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == run => in_run = true,
            Ok(Event::End(e)) => {
                let name = e.name();
                if name.as_ref() == run {
                    in_run = false;
                } else if name.as_ref() == para {
                    let trimmed = line.trim();
                    if !trimmed.is_empty() {
                        lines.push(trimmed.to_string());
                    }
                    line.clear();
                }
            }
            Ok(Event::Text(t)) if in_run => {
                let text = t.unescape().map_err(|e| LoadError::parse(format, e))?;
                line.push_str(&text);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(LoadError::parse(format, e)),
            _ => {}
        }
    }
    let trimmed = line.trim();
    if !trimmed.is_empty() {
        lines.push(trimmed.to_string());
    }
    Ok(lines.join("\n"))
}

pub(super) fn docx_text(path: &Path) -> Result<String, LoadError> {
    let mut archive = open_package(path, "DOCX")?;
    let xml = read_part(&mut archive, "word/document.xml", "DOCX")?
        .ok_or_else(|| LoadError::parse("DOCX", "missing word/document.xml"))?;
    text_runs(&xml, b"w:t", b"w:p", "DOCX")
}

pub(super) fn pptx_text(path: &Path) -> Result<String, LoadError> {
    let mut archive = open_package(path, "PPTX")?;

    let mut slides: Vec<(u32, String)> = archive
        .file_names()
        .filter_map(|name| {
            let number = name.strip_prefix("ppt/slides/slide")?.strip_suffix(".xml")?;
            number.parse().ok().map(|n| (n, name.to_string()))
        })
        .collect();
    slides.sort_by_key(|(n, _)| *n);

    let mut out = Vec::with_capacity(slides.len());
    for (_, name) in slides {
        if let Some(xml) = read_part(&mut archive, &name, "PPTX")? {
            let text = text_runs(&xml, b"a:t", b"a:p", "PPTX")?;
            if !text.is_empty() {
                out.push(text);
            }
        }
    }
    Ok(out.join("\n"))
}
