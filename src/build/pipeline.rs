//! Pipeline orchestration.
//!
//! A [`Pipeline`] reads the files matching a source glob and pushes the
//! resulting [`RecordStream`] through an ordered list of steps. Each step is
//! either a transform [`Stage`] or a write of the current records into a
//! destination directory.

use crate::build::{read_sources, RunReport, StepReport};
use crate::config::resolve_path;
use crate::record::RecordStream;
use crate::stage::{Stage, StageError};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

/// Error during a pipeline run.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PipelineError {
    /// A transform stage failed
    #[error("{stage} failed: {source}")]
    Stage {
        stage: String,
        #[source]
        source: StageError,
    },
    /// Reading a source or writing an output failed
    #[error("{}: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The source glob matched nothing
    #[error("no source files match '{pattern}'")]
    NoSources { pattern: String },
    /// The source glob is malformed
    #[error("invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

impl PipelineError {
    /// The style-language compiler rejected a source.
    pub fn is_compile_error(&self) -> bool {
        matches!(self, PipelineError::Stage { source: StageError::Compile { .. }, .. })
    }

    /// Minification rejected its input.
    pub fn is_minify_error(&self) -> bool {
        matches!(self, PipelineError::Stage { source: StageError::Minify { .. }, .. })
    }

    /// Reading sources or writing outputs failed.
    pub fn is_filesystem_error(&self) -> bool {
        matches!(
            self,
            PipelineError::Filesystem { .. }
                | PipelineError::NoSources { .. }
                | PipelineError::InvalidPattern { .. }
        )
    }
}

/// One step of a pipeline.
pub enum Step {
    /// Transform the records
    Transform(Box<dyn Stage>),
    /// Write the records below a directory (relative to the project root)
    Dest(PathBuf),
}

impl std::fmt::Debug for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Transform(stage) => write!(f, "Transform({})", stage.name()),
            Step::Dest(dir) => write!(f, "Dest({})", dir.display()),
        }
    }
}

/// An ordered chain of stages and destination writes over a source glob.
///
/// # Example
///
/// ```ignore
/// let pipeline = Pipeline::new(root, "src/main.scss")
///     .pipe(CompileStage::default())
///     .dest("dist")
///     .pipe(RenameStage::suffix(".min"))
///     .pipe(MinifyStage::new())
///     .dest("dist");
/// let report = pipeline.run()?;
/// ```
#[derive(Debug)]
pub struct Pipeline {
    root: PathBuf,
    source: String,
    steps: Vec<Step>,
}

impl Pipeline {
    /// Create a pipeline reading `source` (a glob) relative to `root`.
    pub fn new(root: impl Into<PathBuf>, source: impl Into<String>) -> Self {
        Self { root: root.into(), source: source.into(), steps: Vec::new() }
    }

    /// Append a transform stage.
    pub fn pipe(mut self, stage: impl Stage + 'static) -> Self {
        self.steps.push(Step::Transform(Box::new(stage)));
        self
    }

    /// Append a write into `dir`.
    pub fn dest(mut self, dir: impl Into<PathBuf>) -> Self {
        self.steps.push(Step::Dest(dir.into()));
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Read the sources and run every step.
    pub fn run(&self) -> Result<RunReport, PipelineError> {
        let start = Instant::now();
        let records = read_sources(&self.root, &self.source)?;
        let sources = records.iter().map(|r| r.source_path()).collect();

        let mut report = self.run_records(records)?;
        report.sources = sources;
        Ok(report.with_duration(start.elapsed()))
    }

    /// Run every step over an already loaded stream.
    pub fn run_records(&self, mut records: RecordStream) -> Result<RunReport, PipelineError> {
        let start = Instant::now();
        let mut report = RunReport::new();

        for step in &self.steps {
            let step_start = Instant::now();
            match step {
                Step::Transform(stage) => {
                    debug!(stage = stage.name(), records = records.len(), "running stage");
                    records = stage.transform(records).map_err(|source| PipelineError::Stage {
                        stage: stage.name().to_string(),
                        source,
                    })?;
                    report.add_step(StepReport::transform(
                        stage.name(),
                        records.len(),
                        step_start.elapsed(),
                    ));
                }
                Step::Dest(dir) => {
                    let dir = resolve_path(&self.root, dir);
                    let outputs = write_records(&records, &dir)?;
                    debug!(dest = %dir.display(), files = outputs.len(), "wrote records");
                    report.add_step(StepReport::dest(
                        dir.display().to_string(),
                        outputs,
                        step_start.elapsed(),
                    ));
                }
            }
        }

        Ok(report.with_duration(start.elapsed()))
    }
}

/// Write every record below `dir`, replacing existing files.
///
/// Each file is flushed before the next is written.
pub fn write_records(records: &RecordStream, dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let fs_error = |path: &Path, source: std::io::Error| PipelineError::Filesystem {
        path: path.to_path_buf(),
        source,
    };

    fs::create_dir_all(dir).map_err(|e| fs_error(dir, e))?;

    let mut written = Vec::with_capacity(records.len());
    for record in records {
        let target = dir.join(record.path());
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| fs_error(parent, e))?;
        }
        let mut file = File::create(&target).map_err(|e| fs_error(&target, e))?;
        file.write_all(record.contents()).map_err(|e| fs_error(&target, e))?;
        file.flush().map_err(|e| fs_error(&target, e))?;
        written.push(target);
    }
    Ok(written)
}
