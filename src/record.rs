//! File records and record streams
//!
//! A [`FileRecord`] is one file flowing through the pipeline: where it was
//! discovered, its path relative to that location, and its contents. Stages
//! never mutate a record in place; they build new ones with
//! [`FileRecord::with_contents`] and [`FileRecord::with_path`].

use std::path::{Path, PathBuf};

/// Content type inferred from a record's file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// SCSS syntax (`.scss`)
    Scss,
    /// Indented Sass syntax (`.sass`)
    Sass,
    /// Plain CSS (`.css`)
    Css,
    /// Anything else, passed through untouched by style stages
    Other,
}

impl ContentType {
    /// Infer the content type from a path's extension (case-insensitive).
    pub fn from_path(path: &Path) -> Self {
        match path.extension().map(|e| e.to_string_lossy().to_lowercase()).as_deref() {
            Some("scss") => ContentType::Scss,
            Some("sass") => ContentType::Sass,
            Some("css") => ContentType::Css,
            _ => ContentType::Other,
        }
    }

    /// Whether the type needs the style-language compiler.
    pub fn is_style_language(self) -> bool {
        matches!(self, ContentType::Scss | ContentType::Sass)
    }
}

/// A single file travelling through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    base: PathBuf,
    path: PathBuf,
    contents: Vec<u8>,
}

impl FileRecord {
    /// Create a record for `path` (relative to `base`) with the given contents.
    pub fn new(base: impl Into<PathBuf>, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self { base: base.into(), path: path.into(), contents: contents.into() }
    }

    /// Directory the record was discovered under.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Path relative to [`base`](Self::base); also the path used under a destination.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Location of the record on disk before any renaming.
    pub fn source_path(&self) -> PathBuf {
        self.base.join(&self.path)
    }

    /// Raw contents.
    pub fn contents(&self) -> &[u8] {
        &self.contents
    }

    /// Contents as UTF-8 text, if valid.
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.contents).ok()
    }

    /// Content type inferred from the current extension.
    pub fn content_type(&self) -> ContentType {
        ContentType::from_path(&self.path)
    }

    /// A copy of this record with new contents.
    pub fn with_contents(&self, contents: impl Into<Vec<u8>>) -> Self {
        Self { base: self.base.clone(), path: self.path.clone(), contents: contents.into() }
    }

    /// A copy of this record at a new relative path.
    pub fn with_path(&self, path: impl Into<PathBuf>) -> Self {
        Self { base: self.base.clone(), path: path.into(), contents: self.contents.clone() }
    }
}

/// An ordered collection of records handed from one stage to the next.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordStream {
    records: Vec<FileRecord>,
}

impl RecordStream {
    /// Create an empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record.
    pub fn push(&mut self, record: FileRecord) {
        self.records.push(record);
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the stream carries no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over records in order.
    pub fn iter(&self) -> std::slice::Iter<'_, FileRecord> {
        self.records.iter()
    }

    /// Find a record by its relative path.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<&FileRecord> {
        self.records.iter().find(|r| r.path() == path.as_ref())
    }

    /// Apply a fallible per-record transform, keeping order.
    pub fn try_map<E, F>(self, mut f: F) -> Result<Self, E>
    where
        F: FnMut(FileRecord) -> Result<FileRecord, E>,
    {
        let records = self.records.into_iter().map(&mut f).collect::<Result<Vec<_>, E>>()?;
        Ok(Self { records })
    }
}

impl From<Vec<FileRecord>> for RecordStream {
    fn from(records: Vec<FileRecord>) -> Self {
        Self { records }
    }
}

impl FromIterator<FileRecord> for RecordStream {
    fn from_iter<I: IntoIterator<Item = FileRecord>>(iter: I) -> Self {
        Self { records: iter.into_iter().collect() }
    }
}

impl IntoIterator for RecordStream {
    type Item = FileRecord;
    type IntoIter = std::vec::IntoIter<FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a RecordStream {
    type Item = &'a FileRecord;
    type IntoIter = std::slice::Iter<'a, FileRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
