//! Where session source text comes from.

use crate::error::SourceError;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Script text plus where it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub name: String,
    /// Location the text can be re-read from; `None` for inline text.
    pub reference: Option<PathBuf>,
    pub text: String,
}

impl SourceDocument {
    pub fn inline(text: impl Into<String>) -> Self {
        Self {
            name: "<inline>".to_string(),
            reference: None,
            text: text.into(),
        }
    }

    pub fn from_path(path: &Path, text: String) -> Self {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            reference: Some(path.to_path_buf()),
            text,
        }
    }
}

/// Supplies the sources a new session runs before it accepts commands, and user
/// selected documents.
pub trait SourceLoader: Send + Sync {
    /// Ordered preload sources. A failed entry does not stop the ones after it.
    fn preload_sources(&self) -> Vec<Result<SourceDocument, SourceError>>;

    fn load(&self, reference: &Path) -> Result<SourceDocument, SourceError>;
}

/// Reads preload sources from directories and explicit files on disk.
#[derive(Debug, Clone)]
pub struct FsSourceLoader {
    dirs: Vec<PathBuf>,
    files: Vec<PathBuf>,
    extension: String,
}

impl FsSourceLoader {
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            dirs: Vec::new(),
            files: Vec::new(),
            extension: extension.into(),
        }
    }

    /// Preload every file with the configured extension in `dir`, in file-name order.
    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dirs.push(dir.into());
        self
    }

    pub fn with_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.files.push(file.into());
        self
    }

    fn dir_entries(&self, dir: &Path) -> Result<Vec<PathBuf>, SourceError> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(dir).map_err(|err| SourceError::io(dir, err))? {
            let path = entry.map_err(|err| SourceError::io(dir, err))?.path();
            let matches = path
                .extension()
                .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case(&self.extension));
            if matches && path.is_file() {
                paths.push(path);
            }
        }
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(paths)
    }
}

impl SourceLoader for FsSourceLoader {
    fn preload_sources(&self) -> Vec<Result<SourceDocument, SourceError>> {
        let mut sources = Vec::new();
        for dir in &self.dirs {
            match self.dir_entries(dir) {
                Ok(paths) => sources.extend(paths.iter().map(|path| self.load(path))),
                Err(err) => sources.push(Err(err)),
            }
        }
        sources.extend(self.files.iter().map(|path| self.load(path)));
        sources
    }

    fn load(&self, reference: &Path) -> Result<SourceDocument, SourceError> {
        let text = fs::read_to_string(reference).map_err(|err| SourceError::io(reference, err))?;
        tracing::debug!(path = %reference.display(), bytes = text.len(), "source loaded");
        Ok(SourceDocument::from_path(reference, text))
    }
}

/// Loader backed by in-memory text, for embedding hosts and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemorySourceLoader {
    preload: Vec<SourceDocument>,
    documents: HashMap<PathBuf, String>,
}

impl InMemorySourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preload(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.preload.push(SourceDocument {
            name: name.into(),
            reference: None,
            text: text.into(),
        });
        self
    }

    pub fn with_document(mut self, reference: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.documents.insert(reference.into(), text.into());
        self
    }
}

impl SourceLoader for InMemorySourceLoader {
    fn preload_sources(&self) -> Vec<Result<SourceDocument, SourceError>> {
        self.preload.iter().cloned().map(Ok).collect()
    }

    fn load(&self, reference: &Path) -> Result<SourceDocument, SourceError> {
        self.documents
            .get(reference)
            .map(|text| SourceDocument::from_path(reference, text.clone()))
            .ok_or_else(|| SourceError::NotFound(reference.to_path_buf()))
    }
}
