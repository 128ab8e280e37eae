//! Pipeline run result types.

use std::path::PathBuf;
use std::time::Duration;

/// Kind of pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    /// A transform stage
    Transform,
    /// A write to a destination directory
    Dest,
}

impl std::fmt::Display for StepKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepKind::Transform => write!(f, "transform"),
            StepKind::Dest => write!(f, "dest"),
        }
    }
}

/// Outcome of a single pipeline step.
#[derive(Debug, Clone)]
pub struct StepReport {
    /// Stage name, or the destination directory for writes
    pub name: String,
    pub kind: StepKind,
    /// Records leaving the step
    pub records: usize,
    /// Files written (destination steps only)
    pub outputs: Vec<PathBuf>,
    pub duration: Duration,
}

impl StepReport {
    /// Report for a transform stage.
    pub fn transform(name: impl Into<String>, records: usize, duration: Duration) -> Self {
        Self { name: name.into(), kind: StepKind::Transform, records, outputs: vec![], duration }
    }

    /// Report for a destination write.
    pub fn dest(name: impl Into<String>, outputs: Vec<PathBuf>, duration: Duration) -> Self {
        Self { name: name.into(), kind: StepKind::Dest, records: outputs.len(), outputs, duration }
    }
}

/// Result of a complete pipeline run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Source files read
    pub sources: Vec<PathBuf>,
    /// Reports for each step, in execution order
    pub steps: Vec<StepReport>,
    /// Total run duration
    pub total_duration: Duration,
}

impl RunReport {
    /// Create a new empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a step report.
    pub fn add_step(&mut self, step: StepReport) {
        self.steps.push(step);
    }

    /// Set the total duration.
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.total_duration = duration;
        self
    }

    /// All files written, in write order.
    pub fn written(&self) -> Vec<&PathBuf> {
        self.steps.iter().flat_map(|s| s.outputs.iter()).collect()
    }

    /// Number of destination writes performed.
    pub fn materializations(&self) -> usize {
        self.steps.iter().filter(|s| s.kind == StepKind::Dest).count()
    }

    /// Format a one-line summary of the run.
    pub fn summary(&self) -> String {
        let sources = self.sources.len();
        let written = self.written().len();
        format!(
            "{} source{} -> {} file{} written in {:?}",
            sources,
            if sources == 1 { "" } else { "s" },
            written,
            if written == 1 { "" } else { "s" },
            self.total_duration
        )
    }
}
