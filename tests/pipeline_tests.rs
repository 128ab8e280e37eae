//! Pipeline integration tests
//!
//! Runs the standard stylesheet pipeline end to end against scratch
//! projects: compile, normalize, format, prefix, write, rename, minify, write.

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use stylepipe::build::css_pipeline;
use stylepipe::config::{default_config, StyleConfig};
use stylepipe::stage::MinifyStage;

// ============================================================================
// Test Utilities
// ============================================================================

/// Create a test file with content.
fn create_test_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Project with a single entry file `src/main.scss`.
fn project_with(source: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    create_test_file(temp.path(), "src/main.scss", source);
    temp
}

fn build(config: &StyleConfig, root: &Path) {
    css_pipeline(config, root).unwrap().run().unwrap();
}

fn read(root: &Path, path: &str) -> String {
    fs::read_to_string(root.join(path)).unwrap()
}

// ============================================================================
// Outputs
// ============================================================================

#[test]
fn test_button_rule_produces_readable_and_minified_outputs() {
    let temp = project_with(".btn { color: red; }");
    build(&default_config(), temp.path());

    assert_eq!(read(temp.path(), "dist/main.css"), ".btn {\n  color: red;\n}\n");
    assert_eq!(read(temp.path(), "dist/main.min.css"), ".btn{color:red}");
}

#[test]
fn test_scss_features_are_compiled() {
    let temp = project_with(
        "$gap: 0px;\n.nav {\n  margin: $gap;\n  a { text-decoration: none; }\n}\n.empty {}\n",
    );
    build(&default_config(), temp.path());

    let css = read(temp.path(), "dist/main.css");
    assert!(css.contains(".nav {\n  margin: 0;\n}"), "got:\n{css}");
    assert!(css.contains(".nav a {\n  text-decoration: none;\n}"), "got:\n{css}");
    assert!(!css.contains("$gap"));
    assert!(!css.contains(".empty"));
}

#[test]
fn test_partials_are_imported_not_emitted() {
    let temp = project_with("@use 'vars';\n.btn { color: vars.$brand; }\n");
    create_test_file(temp.path(), "src/_vars.scss", "$brand: blue;\n");

    let mut config = default_config();
    config.project.source = "src/*.scss".to_string();
    build(&config, temp.path());

    assert!(read(temp.path(), "dist/main.css").contains("color: blue;"));
    assert!(!temp.path().join("dist/_vars.css").exists());
    assert!(!temp.path().join("dist/vars.css").exists());
}

#[test]
fn test_second_output_is_the_minified_first_output() {
    let temp = project_with(
        ".card {\n  padding: 4px 8px;\n  color: #FFFFFF;\n  display: flex;\n}\n@media (max-width: 600px) {\n  .card { padding: 0; }\n}\n",
    );
    build(&default_config(), temp.path());

    let readable = read(temp.path(), "dist/main.css");
    let minified = read(temp.path(), "dist/main.min.css");
    let expected = MinifyStage::new().minify(Path::new("main.css"), &readable).unwrap();
    assert_eq!(minified, expected);
    assert!(minified.len() < readable.len());
}

#[test]
fn test_minified_name_inserts_suffix_before_extension() {
    let temp = TempDir::new().unwrap();
    create_test_file(temp.path(), "src/site.scss", "a { color: red; }");
    create_test_file(temp.path(), "src/print.scss", "a { color: black; }");

    let mut config = default_config();
    config.project.source = "src/*.scss".to_string();
    config.rename.suffix = "-compact".to_string();
    build(&config, temp.path());

    for name in ["site.css", "site-compact.css", "print.css", "print-compact.css"] {
        assert!(temp.path().join("dist").join(name).exists(), "missing {name}");
    }
}

#[test]
fn test_configured_indent_is_used_per_level() {
    let temp = project_with("@media screen { .btn { color: red; } }");
    let mut config = default_config();
    config.format.indent = "    ".to_string();
    build(&config, temp.path());

    assert_eq!(
        read(temp.path(), "dist/main.css"),
        "@media screen {\n    .btn {\n        color: red;\n    }\n}\n"
    );
}

#[test]
fn test_vendor_prefixes_follow_browser_targets() {
    let source = ".box { user-select: none; }";

    let temp = project_with(source);
    build(&default_config(), temp.path());
    assert!(read(temp.path(), "dist/main.css").contains("-webkit-user-select: none;"));

    let temp = project_with(source);
    let mut config = default_config();
    config.prefix.enabled = false;
    build(&config, temp.path());
    assert!(!read(temp.path(), "dist/main.css").contains("-webkit-"));
}

#[test]
fn test_comments_and_separate_rules_reach_readable_output() {
    let temp = project_with(
        "/* Header comment */\n.a { color: red; }\n.b { color: red; }\n\
         .c { margin-top: 1px; margin-right: 1px; margin-bottom: 1px; margin-left: 1px; }\n\
         .d { background: #FF0000; }\n",
    );
    build(&default_config(), temp.path());

    let css = read(temp.path(), "dist/main.css");
    assert!(css.starts_with("/* Header comment */\n"), "got:\n{css}");
    assert!(css.contains(".a {\n  color: red;\n}"), "got:\n{css}");
    assert!(css.contains(".b {\n  color: red;\n}"), "got:\n{css}");
    assert!(!css.contains(".a, .b"), "got:\n{css}");
    assert!(css.contains("  margin-top: 1px;\n"), "got:\n{css}");
    assert!(css.contains("  margin-left: 1px;\n"), "got:\n{css}");
    assert!(!css.contains("margin: "), "got:\n{css}");
    assert!(css.contains("background: #f00;"), "got:\n{css}");
}

#[test]
fn test_zero_lengths_inside_math_functions_are_kept() {
    let temp = project_with(
        ".box { width: calc(0px + 10%); height: max(0em, 5vh); padding: clamp(0rem, 2vw, 1rem); margin: 0px; }",
    );
    build(&default_config(), temp.path());

    let css = read(temp.path(), "dist/main.css");
    assert!(css.contains("width: calc(0px + 10%);"), "got:\n{css}");
    assert!(css.contains("height: max(0em, 5vh);"), "got:\n{css}");
    assert!(css.contains("padding: clamp(0rem, 2vw, 1rem);"), "got:\n{css}");
    assert!(css.contains("margin: 0;"), "got:\n{css}");

    let minified = read(temp.path(), "dist/main.min.css");
    assert!(!minified.contains("calc(0 +"), "got:\n{minified}");
}

// ============================================================================
// Stability and failure
// ============================================================================

#[test]
fn test_rerun_is_byte_identical() {
    let temp = project_with(
        ".a {\n  z-index: 2;\n  color: #AABBCC;\n  margin: 0px auto;\n  display: block;\n}\n",
    );
    let config = default_config();

    build(&config, temp.path());
    let first = (read(temp.path(), "dist/main.css"), read(temp.path(), "dist/main.min.css"));
    build(&config, temp.path());
    let second = (read(temp.path(), "dist/main.css"), read(temp.path(), "dist/main.min.css"));

    assert_eq!(first, second);
}

#[test]
fn test_compile_error_writes_nothing() {
    let temp = project_with(".btn { color: red;");
    let err = css_pipeline(&default_config(), temp.path()).unwrap().run().unwrap_err();

    assert!(err.is_compile_error());
    assert!(err.to_string().contains("main.scss"));
    assert!(!temp.path().join("dist").exists());
}

#[test]
fn test_missing_source_is_reported() {
    let temp = TempDir::new().unwrap();
    let err = css_pipeline(&default_config(), temp.path()).unwrap().run().unwrap_err();
    assert!(err.is_filesystem_error());
}

#[test]
fn test_report_lists_both_writes() {
    let temp = project_with(".btn { color: red; }");
    let report = css_pipeline(&default_config(), temp.path()).unwrap().run().unwrap();

    assert_eq!(report.sources, vec![temp.path().join("src/main.scss")]);
    assert_eq!(report.materializations(), 2);
    assert_eq!(
        report.written(),
        vec![&temp.path().join("dist/main.css"), &temp.path().join("dist/main.min.css")]
    );
}
