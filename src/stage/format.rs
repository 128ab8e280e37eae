//! Pretty printing with a configured indent (a cssbeautify-style pass).

use super::{map_css, Stage, StageError};
use crate::css::{self, Formatter};
use crate::record::RecordStream;

/// Re-prints CSS records with one declaration per line.
#[derive(Debug, Clone, Default)]
pub struct FormatStage {
    formatter: Formatter,
}

impl FormatStage {
    /// Create a stage indenting each nesting level with `indent`.
    pub fn new(indent: impl Into<String>) -> Self {
        Self { formatter: Formatter::new(indent) }
    }

    pub fn formatter(&self) -> &Formatter {
        &self.formatter
    }
}

impl Stage for FormatStage {
    fn name(&self) -> &str {
        "format"
    }

    fn transform(&self, records: RecordStream) -> Result<RecordStream, StageError> {
        map_css(records, |record, text| {
            let sheet = css::parse(text).map_err(|e| StageError::Syntax {
                file: record.source_path(),
                message: e.to_string(),
            })?;
            Ok(self.formatter.print(&sheet))
        })
    }
}
