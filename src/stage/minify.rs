//! Minification through lightningcss.

use super::{map_css, Stage, StageError};
use crate::record::RecordStream;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};

/// Strips whitespace and comments and shortens values in CSS records.
#[derive(Debug, Clone, Default)]
pub struct MinifyStage;

impl MinifyStage {
    pub fn new() -> Self {
        Self
    }

    /// Minify a single stylesheet.
    pub fn minify(&self, file: &std::path::Path, text: &str) -> Result<String, StageError> {
        let minify_error =
            |message: String| StageError::Minify { file: file.to_path_buf(), message };

        let options =
            ParserOptions { filename: file.display().to_string(), ..ParserOptions::default() };
        let mut sheet = StyleSheet::parse(text, options).map_err(|e| minify_error(e.to_string()))?;
        sheet.minify(MinifyOptions::default()).map_err(|e| minify_error(e.to_string()))?;
        let printed = sheet
            .to_css(PrinterOptions { minify: true, ..PrinterOptions::default() })
            .map_err(|e| minify_error(e.to_string()))?;
        Ok(printed.code)
    }
}

impl Stage for MinifyStage {
    fn name(&self) -> &str {
        "minify"
    }

    fn transform(&self, records: RecordStream) -> Result<RecordStream, StageError> {
        map_css(records, |record, text| self.minify(&record.source_path(), text))
    }
}
