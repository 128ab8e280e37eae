//! Watch mode for automatic reruns on file changes
//!
//! Subscribes to the directory under the watch glob and runs the configured
//! task through the registry whenever a matching file changes. Runs are
//! serialized by a [`RunGate`]: changes that arrive during a run are
//! coalesced into a single follow-up run.

use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult, DebouncedEventKind};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::build::{glob_base, is_recursive};
use crate::config::{resolve_path, DeleteAction, StyleConfig, WatchConfig};
use crate::output::{clear_screen, log_error, log_line};
use crate::stage::RenameStage;
use crate::task::{TaskError, TaskRegistry};

/// Error during watch mode
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WatchError {
    /// Failed to initialize file watcher
    #[error("Failed to initialize file watcher: {0}")]
    WatcherInit(#[source] notify::Error),
    /// Failed to add watch path
    #[error("Failed to watch path: {0}")]
    WatchPath(#[source] notify::Error),
    /// Directory under the watch pattern does not exist
    #[error("Watch directory not found: {}", .0.display())]
    SourceNotFound(PathBuf),
    /// Watch pattern is malformed
    #[error("invalid watch pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    /// Event channel closed
    #[error("Channel error: {0}")]
    ChannelError(String),
}

/// Decides which filesystem paths belong to the watch glob.
#[derive(Debug, Clone)]
pub struct WatchRule {
    raw: String,
    pattern: glob::Pattern,
    root: PathBuf,
    canonical_root: Option<PathBuf>,
}

impl WatchRule {
    /// Build a rule for `pattern`, relative to `root`.
    pub fn new(root: &Path, pattern: &str) -> Result<Self, WatchError> {
        let relative = pattern.trim_start_matches("./");
        let compiled = glob::Pattern::new(relative).map_err(|source| WatchError::Pattern {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            raw: relative.to_string(),
            pattern: compiled,
            root: root.to_path_buf(),
            canonical_root: root.canonicalize().ok(),
        })
    }

    /// The directory to subscribe to.
    pub fn watch_dir(&self) -> PathBuf {
        resolve_path(&self.root, &glob_base(&self.raw))
    }

    pub fn recursive_mode(&self) -> RecursiveMode {
        if is_recursive(&self.raw) {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        }
    }

    /// Whether an event path matches the pattern.
    pub fn matches(&self, path: &Path) -> bool {
        let options = glob::MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        match self.relative(path) {
            Some(relative) => self.pattern.matches_path_with(relative, options),
            None => false,
        }
    }

    fn relative<'p>(&self, path: &'p Path) -> Option<&'p Path> {
        if path.is_relative() {
            return Some(path);
        }
        path.strip_prefix(&self.root)
            .ok()
            .or_else(|| self.canonical_root.as_ref().and_then(|r| path.strip_prefix(r).ok()))
    }
}

/// Serializes task runs: one at a time, with at most one queued follow-up.
///
/// A request that arrives while a run is in progress marks a follow-up;
/// further requests before the follow-up starts are coalesced into it.
#[derive(Debug, Default)]
pub struct RunGate {
    running: AtomicBool,
    pending: AtomicBool,
}

impl RunGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a run. Returns `true` when the caller now owns the gate and
    /// must run; `false` when a run is in progress and a follow-up was marked.
    pub fn request(&self) -> bool {
        if self.running.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire).is_ok() {
            return true;
        }
        self.pending.store(true, Ordering::Release);
        false
    }

    /// Called by the gate owner after a run. Returns `true` when a follow-up
    /// was requested, in which case the owner keeps the gate and runs again.
    pub fn finish(&self) -> bool {
        if self.pending.swap(false, Ordering::AcqRel) {
            return true;
        }
        self.running.store(false, Ordering::Release);
        // A request may have landed between the swap and the store.
        if self.pending.load(Ordering::Acquire)
            && self
                .running
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
        {
            self.pending.store(false, Ordering::Release);
            return true;
        }
        false
    }

    /// Drop the gate and any pending follow-up.
    pub fn release(&self) {
        self.pending.store(false, Ordering::Release);
        self.running.store(false, Ordering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run `f` under the gate, repeating while follow-ups are requested.
    /// Returns the number of runs performed by this caller.
    pub fn run<F>(&self, mut f: F) -> usize
    where
        F: FnMut(),
    {
        if !self.request() {
            return 0;
        }
        let mut runs = 0;
        loop {
            f();
            runs += 1;
            if !self.finish() {
                return runs;
            }
        }
    }
}

/// Removes the outputs derived from a deleted entry file.
#[derive(Debug, Clone)]
pub struct CleanPlan {
    source_base: PathBuf,
    dest: PathBuf,
    rename: RenameStage,
}

impl CleanPlan {
    pub fn new(source_base: PathBuf, dest: PathBuf, rename: RenameStage) -> Self {
        Self { source_base, dest, rename }
    }

    /// Build the plan for a project configuration.
    pub fn from_config(config: &StyleConfig, root: &Path) -> Self {
        Self::new(
            resolve_path(root, &glob_base(&config.project.source)),
            resolve_path(root, &config.project.dest),
            RenameStage::new(config.rename.prefix.clone(), config.rename.suffix.clone()),
        )
    }

    /// Output paths (plain and renamed) produced from `source`.
    pub fn outputs_for(&self, source: &Path) -> Vec<PathBuf> {
        let relative = source.strip_prefix(&self.source_base).map(Path::to_path_buf).ok().or_else(|| {
            let base = self.source_base.canonicalize().ok()?;
            source.strip_prefix(base).map(Path::to_path_buf).ok()
        });
        match relative {
            Some(relative) => self.outputs_for_relative(&relative),
            None => Vec::new(),
        }
    }

    fn outputs_for_relative(&self, relative: &Path) -> Vec<PathBuf> {
        let css = relative.with_extension("css");
        vec![self.dest.join(&css), self.dest.join(self.rename.rename(&css))]
    }

    /// Delete the existing outputs of `source`, returning the removed paths.
    pub fn remove_outputs(&self, source: &Path) -> Vec<PathBuf> {
        let mut removed = Vec::new();
        for output in self.outputs_for(source) {
            if !output.is_file() {
                continue;
            }
            match fs::remove_file(&output) {
                Ok(()) => removed.push(output),
                Err(e) => warn!("failed to remove {}: {}", output.display(), e),
            }
        }
        removed
    }
}

/// Watch mode settings
#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Project root that patterns are relative to
    pub root: PathBuf,
    pub config: WatchConfig,
    /// Used when deletions are configured to clean outputs
    pub clean: Option<CleanPlan>,
}

impl WatchOptions {
    pub fn from_config(config: &StyleConfig, root: &Path) -> Self {
        let clean = (config.watch.on_delete == DeleteAction::Clean)
            .then(|| CleanPlan::from_config(config, root));
        Self { root: root.to_path_buf(), config: config.watch.clone(), clean }
    }
}

/// Handles event batches for one watch session.
pub struct WatchSession<'a> {
    registry: &'a TaskRegistry,
    options: &'a WatchOptions,
    rule: WatchRule,
    gate: RunGate,
}

impl<'a> WatchSession<'a> {
    /// Fails with [`TaskError::UnknownTask`] when the watched task is not
    /// registered.
    pub fn new(registry: &'a TaskRegistry, options: &'a WatchOptions) -> Result<Self, TaskError> {
        if !registry.contains(&options.config.task) {
            return Err(TaskError::UnknownTask(options.config.task.clone()));
        }
        let rule = WatchRule::new(&options.root, &options.config.pattern)?;
        Ok(Self { registry, options, rule, gate: RunGate::new() })
    }

    pub fn rule(&self) -> &WatchRule {
        &self.rule
    }

    /// Run the watched task once, honoring `continue_on_error`.
    pub fn run_task(&self) -> Result<(), TaskError> {
        if self.options.config.clear_screen {
            clear_screen();
        }
        match self.registry.run(&self.options.config.task) {
            Err(e) if self.options.config.continue_on_error => {
                log_error(format!("Error: {}", e));
                Ok(())
            }
            result => result,
        }
    }

    /// Look at changed paths and report whether they call for a run.
    ///
    /// Deleted files are cleaned or ignored according to `on_delete`.
    pub fn absorb(&self, paths: &[PathBuf]) -> bool {
        let mut wants_run = false;
        for path in paths.iter().filter(|p| self.rule.matches(p)) {
            let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            if path.exists() {
                log_line(format!("Changed: {}", name));
                wants_run = true;
                continue;
            }

            log_line(format!("Deleted: {}", name));
            match self.options.config.on_delete {
                DeleteAction::Rebuild => wants_run = true,
                DeleteAction::Ignore => {}
                DeleteAction::Clean => {
                    if let Some(plan) = &self.options.clean {
                        for removed in plan.remove_outputs(path) {
                            log_line(format!("Removed: {}", removed.display()));
                        }
                    }
                }
            }
        }
        wants_run
    }

    /// Handle one debounced batch. `drain` returns the paths of events queued
    /// while a run was in progress; they are coalesced into one follow-up.
    ///
    /// Returns the number of task runs performed.
    pub fn handle_batch<D>(&self, paths: &[PathBuf], mut drain: D) -> Result<usize, TaskError>
    where
        D: FnMut() -> Vec<PathBuf>,
    {
        if !self.absorb(paths) || !self.gate.request() {
            return Ok(0);
        }

        let mut runs = 0;
        loop {
            let result = self.run_task();
            runs += 1;
            if let Err(e) = result {
                self.gate.release();
                return Err(e);
            }
            if self.absorb(&drain()) {
                self.gate.request();
            }
            if !self.gate.finish() {
                return Ok(runs);
            }
        }
    }
}

/// Paths of the qualifying events in a debouncer result. Watch errors are
/// logged and yield no paths.
fn event_paths(result: DebounceEventResult) -> Vec<PathBuf> {
    match result {
        Ok(events) => events
            .into_iter()
            .filter(|e| matches!(e.kind, DebouncedEventKind::Any | DebouncedEventKind::AnyContinuous))
            .map(|e| e.path)
            .collect(),
        Err(error) => {
            // Watch error (non-fatal) - log but continue watching
            log_error(format!("Watch error: {:?}", error));
            Vec::new()
        }
    }
}

fn drain_queued(rx: &Receiver<DebounceEventResult>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    while let Ok(result) = rx.try_recv() {
        paths.extend(event_paths(result));
    }
    paths
}

/// Watch the configured pattern and run the configured task on changes.
///
/// This function blocks until the event channel closes or, with
/// `continue_on_error = false`, until a run fails.
///
/// # Example
/// ```ignore
/// let registry = standard_registry(&config, &root);
/// watch(&registry, &WatchOptions::from_config(&config, &root))?;
/// ```
pub fn watch(registry: &TaskRegistry, options: &WatchOptions) -> Result<(), TaskError> {
    let session = WatchSession::new(registry, options)?;

    let watch_dir = session.rule().watch_dir();
    if !watch_dir.is_dir() {
        return Err(WatchError::SourceNotFound(watch_dir).into());
    }

    let (tx, rx) = channel();
    let debounce = Duration::from_millis(u64::from(options.config.debounce_ms));
    let mut debouncer = new_debouncer(debounce, tx).map_err(WatchError::WatcherInit)?;
    debouncer
        .watcher()
        .watch(&watch_dir, session.rule().recursive_mode())
        .map_err(WatchError::WatchPath)?;
    debug!(dir = %watch_dir.display(), pattern = %options.config.pattern, "subscribed");

    if options.config.run_on_start {
        session.run_task()?;
    }
    log_line(format!("Watching {} for changes...", options.config.pattern));

    loop {
        match rx.recv() {
            Ok(result) => {
                let paths = event_paths(result);
                let runs = session.handle_batch(&paths, || drain_queued(&rx))?;
                if runs > 0 {
                    log_line(format!("Watching {} for changes...", options.config.pattern));
                }
            }
            Err(e) => return Err(WatchError::ChannelError(e.to_string()).into()),
        }
    }
}
