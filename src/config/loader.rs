//! Configuration loading and discovery for `stylepipe.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::StyleConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the project configuration file.
pub const CONFIG_FILE_NAME: &str = "stylepipe.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse stylepipe.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override the source glob
    pub source: Option<String>,
    /// Override the destination directory
    pub dest: Option<PathBuf>,
    /// Override the format indent with this many spaces
    pub indent: Option<usize>,
}

/// Find stylepipe.toml by walking up from the current working directory.
pub fn find_config() -> Option<PathBuf> {
    env::current_dir().ok().and_then(find_config_from)
}

/// Find stylepipe.toml by walking up from a specific directory.
///
/// This is the internal implementation that allows specifying the start directory,
/// useful for testing.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        // Move to parent directory
        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a stylepipe.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses `find_config()`
/// to locate the config file. If no config file is found, returns the default
/// configuration.
///
/// # Example
/// ```ignore
/// let config = load_config(None)?;
/// let config = load_config(Some(Path::new("site/stylepipe.toml")))?;
/// ```
pub fn load_config(path: Option<&Path>) -> Result<StyleConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => load_config_file(&p),
        None => Ok(default_config()),
    }
}

/// Load configuration from a specific file path.
fn load_config_file(path: &Path) -> Result<StyleConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    let config: StyleConfig = toml::from_str(&contents)?;
    check(config)
}

/// Validate a configuration, turning any problems into a [`ConfigError`].
pub fn check(config: StyleConfig) -> Result<StyleConfig, ConfigError> {
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }
    Ok(config)
}

/// The configuration used when no stylepipe.toml is found.
pub fn default_config() -> StyleConfig {
    StyleConfig::default()
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut StyleConfig, overrides: &CliOverrides) {
    if let Some(ref source) = overrides.source {
        config.project.source = source.clone();
    }

    if let Some(ref dest) = overrides.dest {
        config.project.dest = dest.clone();
    }

    if let Some(width) = overrides.indent {
        config.format.indent = " ".repeat(width);
    }
}

/// Get the project root directory from a config file path.
///
/// Returns the parent directory of the stylepipe.toml file.
pub fn project_root(config_path: &Path) -> Option<&Path> {
    config_path.parent()
}

/// Resolve a path relative to the project root.
///
/// If the path is absolute, returns it unchanged.
/// If relative, joins it with the project root.
pub fn resolve_path(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_config(dir: &Path, content: &str) -> PathBuf {
        let config_path = dir.join(CONFIG_FILE_NAME);
        File::create(&config_path)
            .expect("should create config file")
            .write_all(content.as_bytes())
            .expect("should write config content");
        config_path
    }

    #[test]
    fn test_find_config_in_current_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(temp.path(), "[project]\ndest = \"out\"");

        let found = find_config_from(temp.path().to_path_buf());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_in_parent_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(temp.path(), "");

        let subdir = temp.path().join("src").join("partials");
        fs::create_dir_all(&subdir).expect("should create subdirectories");

        let found = find_config_from(subdir);
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_not_found() {
        let temp = TempDir::new().expect("should create temp dir");
        let found = find_config_from(temp.path().to_path_buf());
        assert_eq!(found, None);
    }

    #[test]
    fn test_load_config_from_file() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(
            temp.path(),
            r#"
[project]
source = "scss/site.scss"
dest = "www/css"

[format]
indent = "    "
"#,
        );

        let config = load_config(Some(&config_path)).expect("should load valid config");
        assert_eq!(config.project.source, "scss/site.scss");
        assert_eq!(config.project.dest, PathBuf::from("www/css"));
        assert_eq!(config.format.indent, "    ");
        assert_eq!(config.rename.suffix, ".min");
    }

    #[test]
    fn test_load_config_missing_file_is_an_error() {
        let temp = TempDir::new().expect("should create temp dir");
        let result = load_config(Some(&temp.path().join("nonexistent.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(temp.path(), "this is not valid toml {{{");

        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_validation_error() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = write_config(temp.path(), "[format]\nindent = \"xx\"\n[rename]\nsuffix = \"\"");

        match load_config(Some(&config_path)) {
            Err(ConfigError::Validation(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_cli_overrides() {
        let mut config = default_config();
        let overrides = CliOverrides {
            source: Some("styles/*.scss".to_string()),
            dest: Some(PathBuf::from("build")),
            indent: Some(4),
        };

        merge_cli_overrides(&mut config, &overrides);
        assert_eq!(config.project.source, "styles/*.scss");
        assert_eq!(config.project.dest, PathBuf::from("build"));
        assert_eq!(config.format.indent, "    ");
    }

    #[test]
    fn test_merge_empty_overrides_keeps_config() {
        let mut config = default_config();
        merge_cli_overrides(&mut config, &CliOverrides::default());
        assert_eq!(config.project.source, "src/main.scss");
        assert_eq!(config.format.indent, "  ");
    }

    #[test]
    fn test_resolve_path() {
        let root = Path::new("/project");
        assert_eq!(resolve_path(root, Path::new("/other/path")), PathBuf::from("/other/path"));
        assert_eq!(resolve_path(root, Path::new("dist")), PathBuf::from("/project/dist"));
    }

    #[test]
    fn test_project_root() {
        let config_path = Path::new("/project/stylepipe.toml");
        assert_eq!(project_root(config_path), Some(Path::new("/project")));
    }
}
