//! # Document Library
//!
//! The storage boundary. Sessions ask a [`DocumentSource`] for the listing
//! once when they start and for a document's raw bytes on every selection.
//! Nothing here is cached: two sessions started at different times may see
//! different listings.

use log::debug;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A listed document. Order is whatever the source returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub name: String,
    pub description: String,
}

impl Document {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

#[derive(Debug)]
pub enum SourceError {
    Io(io::Error),
    /// The requested name is not a document this source serves.
    NotFound(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Io(e) => write!(f, "{e}"),
            SourceError::NotFound(name) => write!(f, "no such document: {name}"),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<io::Error> for SourceError {
    fn from(e: io::Error) -> Self {
        SourceError::Io(e)
    }
}

pub trait DocumentSource: Send + Sync {
    fn list_documents(&self) -> Result<Vec<Document>, SourceError>;

    fn read_document(&self, name: &str) -> Result<Vec<u8>, SourceError>;
}

/// Serves every file with a given extension from one flat directory.
///
/// Listing is sorted by file name. A document's description comes from the
/// first non-empty line of its leading metadata block.
pub struct DirectorySource {
    root: PathBuf,
    extension: String,
    header_lines: usize,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>, header_lines: usize) -> Self {
        Self {
            root: root.into(),
            extension: extension.into(),
            header_lines,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Regular files only. Symlinks are not followed, so a link inside the
    /// root can never serve a file from outside it.
    fn is_document(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok_and(|meta| meta.file_type().is_file())
            && path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension))
    }

    /// Resolve a listed name to a path inside the root, refusing anything
    /// that would escape it.
    fn resolve(&self, name: &str) -> Result<PathBuf, SourceError> {
        let candidate = Path::new(name);
        let plain = candidate.components().count() == 1
            && candidate
                .file_name()
                .is_some_and(|f| f == candidate.as_os_str());
        if !plain {
            return Err(SourceError::NotFound(name.to_string()));
        }
        let path = self.root.join(candidate);
        if !self.is_document(&path) {
            return Err(SourceError::NotFound(name.to_string()));
        }
        Ok(path)
    }
}

impl DocumentSource for DirectorySource {
    fn list_documents(&self) -> Result<Vec<Document>, SourceError> {
        let mut paths: Vec<PathBuf> = fs::read_dir(&self.root)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| self.is_document(path))
            .collect();
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in paths {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                debug!("Skipping non UTF-8 file name: {}", path.display());
                continue;
            };
            let contents = fs::read(&path)?;
            let text = String::from_utf8_lossy(&contents);
            let description =
                describe(&text, self.header_lines).unwrap_or_else(|| name.to_string());
            documents.push(Document::new(name, description));
        }
        debug!(
            "Listed {} documents from {}",
            documents.len(),
            self.root.display()
        );
        Ok(documents)
    }

    fn read_document(&self, name: &str) -> Result<Vec<u8>, SourceError> {
        let path = self.resolve(name)?;
        Ok(fs::read(path)?)
    }
}

/// Pull a one-line description out of the metadata block.
///
/// Accepts `description: text`, a markdown heading, or a bare line.
fn describe(text: &str, header_lines: usize) -> Option<String> {
    text.lines()
        .take(header_lines.max(1))
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(|line| {
            let line = match line.split_once(':') {
                Some((key, value)) if key.trim().eq_ignore_ascii_case("description") => value,
                _ => line.trim_start_matches('#'),
            };
            line.trim().to_string()
        })
        .filter(|line| !line.is_empty())
}
