use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::chunker::WordWindows;
use crate::config::{ChunkingSettings, DataSettings};
use crate::loader::{DocumentLoader, LoadedDocument};
use crate::types::Chunk;

/// A file that could not be turned into chunks, with a readable reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct ProcessOutcome {
    pub chunks: Vec<Chunk>,
    pub failures: Vec<FileFailure>,
    pub files_ok: usize,
}

impl ProcessOutcome {
    pub fn files_total(&self) -> usize {
        self.files_ok + self.failures.len()
    }
}

/// Loads input files and cuts them into chunks, isolating per-file failures.
#[derive(Debug, Clone, Default)]
pub struct DataProcessor {
    loader: DocumentLoader,
    chunking: ChunkingSettings,
}

impl DataProcessor {
    pub fn new() -> Self { Self::default() }

    pub fn with_settings(data: &DataSettings, chunking: ChunkingSettings) -> Self {
        Self { loader: DocumentLoader::new(data.max_file_size, data.max_sheet_rows), chunking }
    }

    /// Process files and directories. Directories are walked recursively and
    /// only supported files inside them are considered; explicitly named files
    /// are always attempted so unsupported ones show up as failures.
    pub fn process_paths(&self, inputs: &[PathBuf]) -> ProcessOutcome {
        let mut outcome = ProcessOutcome::default();
        let files = expand_inputs(inputs, &mut outcome.failures);

        for (file_index, file_path) in files.iter().enumerate() {
            debug!(file = %file_path.display(), "processing file {}/{}", file_index + 1, files.len());
            match self.process_file(file_path) {
                Ok(chunks) => {
                    outcome.files_ok += 1;
                    outcome.chunks.extend(chunks);
                }
                Err(error) => {
                    warn!(file = %file_path.display(), %error, "skipping file");
                    outcome.failures.push(FileFailure { path: file_path.clone(), error });
                }
            }
        }
        info!(
            files = outcome.files_total(),
            failed = outcome.failures.len(),
            chunks = outcome.chunks.len(),
            "processed input files"
        );
        outcome
    }

    pub fn process_directory(&self, data_dir: &Path) -> ProcessOutcome {
        self.process_paths(&[data_dir.to_path_buf()])
    }

    fn process_file(&self, path: &Path) -> Result<Vec<Chunk>, String> {
        let doc = self.loader.load(path).map_err(|e| e.to_string())?;
        self.chunk_document(&doc).map_err(|e| e.to_string())
    }

    pub fn chunk_document(&self, doc: &LoadedDocument) -> crate::Result<Vec<Chunk>> {
        let cfg = self.chunking.for_modality(doc.modality);
        let chunks = WordWindows::new(&doc.text, cfg)?
            .map(|text| Chunk { text, doc_name: doc.doc_name.clone(), modality: doc.modality })
            .collect();
        Ok(chunks)
    }
}

/// Named files as given plus the supported files found under each directory.
/// Directory entries that cannot be read are recorded in `failures`.
pub fn expand_inputs(inputs: &[PathBuf], failures: &mut Vec<FileFailure>) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            files.extend(list_supported_files(input, failures));
        } else {
            files.push(input.clone());
        }
    }
    files
}

/// Supported files under `root`, sorted. Entries the walk cannot read are
/// recorded in `failures`.
fn list_supported_files(root: &Path, failures: &mut Vec<FileFailure>) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root) {
        match entry {
            Ok(e) if e.file_type().is_file() && DocumentLoader::is_supported(e.path()) => files.push(e.into_path()),
            Ok(_) => {}
            Err(e) => {
                let path = e.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
                warn!(path = %path.display(), error = %e, "cannot read directory entry");
                failures.push(FileFailure { path, error: e.to_string() });
            }
        }
    }
    files.sort();
    files
}
