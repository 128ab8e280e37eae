//! Source file discovery for the pipeline.
//!
//! Resolves the source glob against the project root and reads matching
//! files into [`FileRecord`]s relative to the glob base.

use crate::build::PipelineError;
use crate::record::{FileRecord, RecordStream};
use glob::glob;
use std::path::{Component, Path, PathBuf};
use tracing::warn;

const GLOB_MAGIC: [char; 3] = ['*', '?', '['];

/// The leading part of a glob pattern that contains no wildcards.
///
/// For a pattern naming a single file this is the file's directory, so
/// `src/main.scss` and `src/*.scss` both have the base `src`.
pub fn glob_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    let mut magic = false;
    for component in Path::new(pattern).components() {
        if component.as_os_str().to_string_lossy().contains(GLOB_MAGIC) {
            magic = true;
            break;
        }
        base.push(component);
    }
    if !magic {
        base.pop();
    }
    base
}

/// Whether a pattern will match files below subdirectories of its base.
pub fn is_recursive(pattern: &str) -> bool {
    pattern.contains("**")
}

/// Build the absolute glob pattern for `pattern` under `root`.
pub fn absolute_pattern(root: &Path, pattern: &str) -> String {
    if Path::new(pattern).is_absolute() {
        return pattern.to_string();
    }
    let relative = pattern.trim_start_matches("./");
    format!("{}/{}", glob::Pattern::escape(&root.to_string_lossy()), relative)
}

/// Style-language partials (`_name.scss`) are only ever imported.
pub fn is_partial(path: &Path) -> bool {
    let partial_name = path.file_name().is_some_and(|n| n.to_string_lossy().starts_with('_'));
    partial_name
        && matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("scss") | Some("sass")
        )
}

/// Discover files matching `pattern` under `root`, sorted.
pub fn discover_sources(root: &Path, pattern: &str) -> Result<Vec<PathBuf>, PipelineError> {
    let full_pattern = absolute_pattern(root, pattern);
    let paths = glob(&full_pattern).map_err(|source| PipelineError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => {
                if path.is_file() && !is_partial(&path) {
                    files.push(path);
                }
            }
            Err(e) => warn!("error reading path: {}", e),
        }
    }

    files.sort();
    Ok(files)
}

/// Discover and read all sources into a record stream.
///
/// Fails with [`PipelineError::NoSources`] when nothing matches.
pub fn read_sources(root: &Path, pattern: &str) -> Result<RecordStream, PipelineError> {
    let files = discover_sources(root, pattern)?;
    if files.is_empty() {
        return Err(PipelineError::NoSources { pattern: pattern.to_string() });
    }

    let base = crate::config::resolve_path(root, &glob_base(pattern));
    let mut records = RecordStream::new();
    for file in files {
        let contents = std::fs::read(&file)
            .map_err(|source| PipelineError::Filesystem { path: file.clone(), source })?;
        let relative = relative_to(&file, &base);
        records.push(FileRecord::new(base.clone(), relative, contents));
    }
    Ok(records)
}

fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let cleaned: PathBuf = base.components().filter(|c| *c != Component::CurDir).collect();
    path.strip_prefix(base)
        .or_else(|_| path.strip_prefix(&cleaned))
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.file_name().map(PathBuf::from).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, path: &str, content: &str) {
        let full = root.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, content).unwrap();
    }

    #[test]
    fn test_glob_base() {
        assert_eq!(glob_base("src/main.scss"), PathBuf::from("src"));
        assert_eq!(glob_base("./src/main.scss"), PathBuf::from("./src"));
        assert_eq!(glob_base("src/*.scss"), PathBuf::from("src"));
        assert_eq!(glob_base("styles/**/*.scss"), PathBuf::from("styles"));
        assert_eq!(glob_base("*.scss"), PathBuf::new());
        assert_eq!(glob_base("main.scss"), PathBuf::new());
        // Braces are literal characters to the glob crate
        assert_eq!(glob_base("src/{a,b}/main.scss"), PathBuf::from("src/{a,b}"));
    }

    #[test]
    fn test_is_partial() {
        assert!(is_partial(Path::new("src/_vars.scss")));
        assert!(is_partial(Path::new("_mixins.sass")));
        assert!(!is_partial(Path::new("src/main.scss")));
        assert!(!is_partial(Path::new("_reset.css")));
    }

    #[test]
    fn test_discover_skips_partials_and_dirs() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "src/main.scss", "");
        touch(temp.path(), "src/theme.scss", "");
        touch(temp.path(), "src/_vars.scss", "");
        touch(temp.path(), "src/nested/deep.scss", "");

        let files = discover_sources(temp.path(), "src/*.scss").unwrap();
        let names: Vec<_> =
            files.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect();
        assert_eq!(names, vec!["main.scss", "theme.scss"]);

        let files = discover_sources(temp.path(), "src/**/*.scss").unwrap();
        assert_eq!(files.len(), 3);
    }

    #[test]
    fn test_read_sources_relative_paths() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "styles/site.scss", "a { b: c }");
        touch(temp.path(), "styles/pages/home.scss", "d { e: f }");

        let records = read_sources(temp.path(), "styles/**/*.scss").unwrap();
        let paths: Vec<_> = records.iter().map(|r| r.path().to_path_buf()).collect();
        assert_eq!(paths, vec![PathBuf::from("pages/home.scss"), PathBuf::from("site.scss")]);
        assert_eq!(records.get("site.scss").unwrap().text(), Some("a { b: c }"));
        assert_eq!(records.get("site.scss").unwrap().base(), temp.path().join("styles"));
    }

    #[test]
    fn test_read_sources_no_match() {
        let temp = TempDir::new().unwrap();
        let err = read_sources(temp.path(), "src/main.scss").unwrap_err();
        assert!(matches!(err, PipelineError::NoSources { .. }));
    }

    #[test]
    fn test_invalid_pattern() {
        let temp = TempDir::new().unwrap();
        let err = discover_sources(temp.path(), "src/[.scss").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidPattern { .. }));
    }
}
