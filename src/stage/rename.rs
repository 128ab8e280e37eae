//! Output renaming.

use super::{Stage, StageError};
use crate::record::RecordStream;
use std::path::{Path, PathBuf};

/// Adds a prefix and/or suffix to each record's base name, keeping the
/// directory and extension: `css/site.css` with suffix `.min` becomes
/// `css/site.min.css`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameStage {
    prefix: String,
    suffix: String,
}

impl RenameStage {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), suffix: suffix.into() }
    }

    /// Rename with a suffix only.
    pub fn suffix(suffix: impl Into<String>) -> Self {
        Self::new("", suffix)
    }

    /// The renamed form of `path`.
    pub fn rename(&self, path: &Path) -> PathBuf {
        let stem = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let mut name = format!("{}{}{}", self.prefix, stem, self.suffix);
        if let Some(ext) = path.extension() {
            name.push('.');
            name.push_str(&ext.to_string_lossy());
        }
        match path.parent() {
            Some(parent) => parent.join(name),
            None => PathBuf::from(name),
        }
    }
}

impl Stage for RenameStage {
    fn name(&self) -> &str {
        "rename"
    }

    fn transform(&self, records: RecordStream) -> Result<RecordStream, StageError> {
        Ok(records.into_iter().map(|r| r.with_path(self.rename(r.path()))).collect())
    }
}
