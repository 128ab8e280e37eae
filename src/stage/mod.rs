//! Transform stages
//!
//! Every step of the stylesheet pipeline implements [`Stage`]: it takes the
//! whole [`RecordStream`] produced by the previous step and returns a new one.
//! Stages are composed explicitly by [`crate::build::Pipeline`], so tests can
//! swap any of them for a fake.

mod compile;
mod format;
mod minify;
mod normalize;
mod prefix;
mod rename;

pub use compile::{CompileOptions, CompileStage};
pub use format::FormatStage;
pub use minify::MinifyStage;
pub use normalize::{NormalizeOptions, NormalizeStage};
pub use prefix::{parse_version, PrefixStage, BROWSER_NAMES};
pub use rename::RenameStage;

use crate::record::{ContentType, FileRecord, RecordStream};
use std::path::PathBuf;
use thiserror::Error;

/// Error raised by a transform stage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum StageError {
    /// Style-language source failed to compile
    #[error("{}: {message}", .file.display())]
    Compile { file: PathBuf, message: String },
    /// CSS could not be minified
    #[error("{}: {message}", .file.display())]
    Minify { file: PathBuf, message: String },
    /// CSS could not be split into blocks
    #[error("{}: {message}", .file.display())]
    Syntax { file: PathBuf, message: String },
    /// Stylesheet contents are not valid UTF-8
    #[error("{}: stylesheet is not valid UTF-8", .file.display())]
    Encoding { file: PathBuf },
}

impl StageError {
    /// The file the error refers to.
    pub fn file(&self) -> &std::path::Path {
        match self {
            StageError::Compile { file, .. }
            | StageError::Minify { file, .. }
            | StageError::Syntax { file, .. }
            | StageError::Encoding { file } => file,
        }
    }
}

/// A transform from one record stream to another.
pub trait Stage {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Transform the stream. Implementations must keep record order.
    fn transform(&self, records: RecordStream) -> Result<RecordStream, StageError>;
}

impl<S: Stage + ?Sized> Stage for Box<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn transform(&self, records: RecordStream) -> Result<RecordStream, StageError> {
        (**self).transform(records)
    }
}

/// Apply `f` to the text of every CSS record, passing other records through.
pub(crate) fn map_css<F>(records: RecordStream, mut f: F) -> Result<RecordStream, StageError>
where
    F: FnMut(&FileRecord, &str) -> Result<String, StageError>,
{
    records.try_map(|record| {
        if record.content_type() != ContentType::Css {
            return Ok(record);
        }
        let text = record
            .text()
            .ok_or_else(|| StageError::Encoding { file: record.source_path() })?;
        let output = f(&record, text)?;
        Ok(record.with_contents(output))
    })
}
