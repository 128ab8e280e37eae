//! Configuration schema types for `stylepipe.toml`
//!
//! Defines the structure and validation rules for a stylepipe project.
//! Every section is optional; a missing file or section means defaults.

use crate::stage::{parse_version, NormalizeOptions, BROWSER_NAMES};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// What a deleted file matching the watch pattern does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DeleteAction {
    /// Run the watched task again
    #[default]
    Rebuild,
    /// Do nothing
    Ignore,
    /// Remove the outputs derived from the deleted file
    Clean,
}

/// Source and destination paths
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Glob pattern for entry stylesheets
    #[serde(default = "default_source")]
    pub source: String,
    /// Destination directory for both outputs
    #[serde(default = "default_dest")]
    pub dest: PathBuf,
}

fn default_source() -> String {
    "src/main.scss".to_string()
}

fn default_dest() -> PathBuf {
    PathBuf::from("dist")
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self { source: default_source(), dest: default_dest() }
    }
}

/// Style-language compiler settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CompileConfig {
    /// Extra import directories, relative to the project root
    #[serde(default)]
    pub load_paths: Vec<PathBuf>,
    /// Silence `@warn` and `@debug`
    #[serde(default)]
    pub quiet: bool,
}

/// Normalization pass switches
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeConfig {
    #[serde(default = "default_true")]
    pub sort_properties: bool,
    #[serde(default = "default_true")]
    pub color_case: bool,
    #[serde(default = "default_true")]
    pub unitless_zero: bool,
    #[serde(default = "default_true")]
    pub remove_empty_rules: bool,
}

fn default_true() -> bool {
    true
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self { sort_properties: true, color_case: true, unitless_zero: true, remove_empty_rules: true }
    }
}

impl NormalizeConfig {
    pub fn options(&self) -> NormalizeOptions {
        NormalizeOptions {
            sort_properties: self.sort_properties,
            color_case: self.color_case,
            unitless_zero: self.unitless_zero,
            remove_empty_rules: self.remove_empty_rules,
        }
    }
}

/// Pretty-printer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatConfig {
    /// Indent unit for each nesting level
    #[serde(default = "default_indent")]
    pub indent: String,
}

fn default_indent() -> String {
    "  ".to_string()
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self { indent: default_indent() }
    }
}

/// Vendor prefixing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefixConfig {
    /// Run the prefixing stage
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Oldest supported version per browser
    #[serde(default = "default_browsers")]
    pub browsers: BTreeMap<String, String>,
}

fn default_browsers() -> BTreeMap<String, String> {
    [("chrome", "80"), ("edge", "88"), ("firefox", "78"), ("ios_saf", "13"), ("safari", "13")]
        .into_iter()
        .map(|(name, version)| (name.to_string(), version.to_string()))
        .collect()
}

impl Default for PrefixConfig {
    fn default() -> Self {
        Self { enabled: true, browsers: default_browsers() }
    }
}

/// Renaming applied before minification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameConfig {
    /// Inserted before the extension
    #[serde(default = "default_suffix")]
    pub suffix: String,
    /// Prepended to the base name
    #[serde(default)]
    pub prefix: String,
}

fn default_suffix() -> String {
    ".min".to_string()
}

impl Default for RenameConfig {
    fn default() -> Self {
        Self { suffix: default_suffix(), prefix: String::new() }
    }
}

/// Watch mode configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Glob pattern of files that trigger a run
    #[serde(default = "default_watch_pattern")]
    pub pattern: String,
    /// Task run on change
    #[serde(default = "default_watch_task")]
    pub task: String,
    /// Debounce delay in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
    /// Run the task once before waiting for changes
    #[serde(default)]
    pub run_on_start: bool,
    /// Clear terminal between rebuilds
    #[serde(default)]
    pub clear_screen: bool,
    /// Keep watching after a failed run
    #[serde(default = "default_true")]
    pub continue_on_error: bool,
    /// Reaction to a deleted matching file
    #[serde(default)]
    pub on_delete: DeleteAction,
}

fn default_watch_pattern() -> String {
    "src/*.scss".to_string()
}

fn default_watch_task() -> String {
    "css".to_string()
}

fn default_debounce_ms() -> u32 {
    100
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            pattern: default_watch_pattern(),
            task: default_watch_task(),
            debounce_ms: default_debounce_ms(),
            run_on_start: false,
            clear_screen: false,
            continue_on_error: true,
            on_delete: DeleteAction::default(),
        }
    }
}

/// Complete stylepipe.toml configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StyleConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub compile: CompileConfig,
    #[serde(default)]
    pub normalize: NormalizeConfig,
    #[serde(default)]
    pub format: FormatConfig,
    #[serde(default)]
    pub prefix: PrefixConfig,
    #[serde(default)]
    pub rename: RenameConfig,
    #[serde(default)]
    pub watch: WatchConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "format.indent")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stylepipe.toml: '{}' {}", self.field, self.message)
    }
}

/// The glob crate has no `{a,b}` alternation and would treat braces literally.
const BRACE_MESSAGE: &str = "uses '{...}' alternation, which is not supported; use one pattern per glob";

fn has_separator(name: &str) -> bool {
    name.contains('/') || name.contains('\\')
}

impl StyleConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();
        let mut push = |field: &str, message: &str| {
            errors.push(ConfigValidationError { field: field.to_string(), message: message.to_string() })
        };

        if self.project.source.trim().is_empty() {
            push("project.source", "must be a non-empty glob pattern");
        } else if let Err(e) = glob::Pattern::new(&self.project.source) {
            push("project.source", &format!("is not a valid glob pattern: {}", e));
        } else if self.project.source.contains('{') {
            push("project.source", BRACE_MESSAGE);
        }

        if self.format.indent.chars().any(|c| c != ' ' && c != '\t') {
            push("format.indent", "must contain only spaces or tabs");
        }

        if self.rename.suffix.is_empty() && self.rename.prefix.is_empty() {
            push("rename.suffix", "must not be empty when rename.prefix is empty");
        }
        if has_separator(&self.rename.suffix) {
            push("rename.suffix", "must not contain path separators");
        }
        if has_separator(&self.rename.prefix) {
            push("rename.prefix", "must not contain path separators");
        }

        for (name, version) in &self.prefix.browsers {
            let field = format!("prefix.browsers.{}", name);
            if !BROWSER_NAMES.contains(&name.as_str()) {
                push(&field, &format!("is not a known browser (expected one of: {})", BROWSER_NAMES.join(", ")));
            } else if parse_version(version).is_none() {
                push(&field, "must be a version like \"13\" or \"13.1\"");
            }
        }

        if self.watch.pattern.trim().is_empty() {
            push("watch.pattern", "must be a non-empty glob pattern");
        } else if let Err(e) = glob::Pattern::new(&self.watch.pattern) {
            push("watch.pattern", &format!("is not a valid glob pattern: {}", e));
        } else if self.watch.pattern.contains('{') {
            push("watch.pattern", BRACE_MESSAGE);
        }
        if self.watch.task.trim().is_empty() {
            push("watch.task", "must name a task");
        }

        errors
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }
}
