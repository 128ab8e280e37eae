//! Style-language compilation (SCSS / indented Sass to CSS).

use super::{Stage, StageError};
use crate::record::{ContentType, RecordStream};
use std::path::PathBuf;
use tracing::debug;

/// Options for the style-language compiler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileOptions {
    /// Extra directories searched by `@use` / `@import`
    pub load_paths: Vec<PathBuf>,
    /// Silence `@warn` and `@debug` output
    pub quiet: bool,
}

/// Compiles `.scss` and `.sass` records to `.css` using `grass`.
///
/// Plain CSS and unrelated records pass through unchanged. The directory
/// holding each source file is always searched first for imports.
#[derive(Debug, Clone, Default)]
pub struct CompileStage {
    options: CompileOptions,
}

impl CompileStage {
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }
}

impl Stage for CompileStage {
    fn name(&self) -> &str {
        "compile"
    }

    fn transform(&self, records: RecordStream) -> Result<RecordStream, StageError> {
        records.try_map(|record| {
            let syntax = match record.content_type() {
                ContentType::Scss => grass::InputSyntax::Scss,
                ContentType::Sass => grass::InputSyntax::Sass,
                ContentType::Css | ContentType::Other => return Ok(record),
            };

            let source_path = record.source_path();
            let text = record
                .text()
                .ok_or_else(|| StageError::Encoding { file: source_path.clone() })?;

            let mut options = grass::Options::default()
                .style(grass::OutputStyle::Expanded)
                .input_syntax(syntax)
                .quiet(self.options.quiet);
            if let Some(dir) = source_path.parent() {
                options = options.load_path(dir);
            }
            for path in &self.options.load_paths {
                options = options.load_path(path);
            }

            debug!(file = %source_path.display(), "compiling");
            let css = grass::from_string(text.to_string(), &options).map_err(|e| {
                StageError::Compile { file: source_path.clone(), message: e.to_string() }
            })?;

            Ok(record.with_contents(css).with_path(record.path().with_extension("css")))
        })
    }
}
