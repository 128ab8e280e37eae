//! Build pipeline module for stylepipe
//!
//! Provides the stylesheet pipeline: source discovery, the ordered chain of
//! transform stages and destination writes, and run reports.
//!
//! # Overview
//!
//! - **Discovery**: Find source files with the configured glob
//! - **Transform**: Push the records through each [`crate::stage::Stage`]
//! - **Dest**: Write the current records into a directory (may happen more than once)
//!
//! # Example
//!
//! ```ignore
//! use stylepipe::build::css_pipeline;
//! use stylepipe::config::default_config;
//!
//! let pipeline = css_pipeline(&default_config(), project_root)?;
//! let report = pipeline.run()?;
//! println!("{}", report.summary());
//! ```

pub mod discovery;
pub mod pipeline;
pub mod result;

pub use discovery::*;
pub use pipeline::*;
pub use result::*;

use crate::config::{resolve_path, StyleConfig};
use crate::css::Formatter;
use crate::stage::{
    CompileOptions, CompileStage, FormatStage, MinifyStage, NormalizeStage, PrefixStage,
    RenameStage,
};
use std::path::Path;

/// Build the standard stylesheet pipeline from configuration:
/// compile, normalize, format, prefix, write, rename, minify, write.
///
/// Fails only if the browser targets are invalid, which validated
/// configurations rule out.
pub fn css_pipeline(config: &StyleConfig, root: &Path) -> Result<Pipeline, String> {
    let compile = CompileStage::new(CompileOptions {
        load_paths: config.compile.load_paths.iter().map(|p| resolve_path(root, p)).collect(),
        quiet: config.compile.quiet,
    });
    let formatter = Formatter::new(config.format.indent.clone());

    let mut pipeline = Pipeline::new(root, config.project.source.clone())
        .pipe(compile)
        .pipe(NormalizeStage::new(config.normalize.options()))
        .pipe(FormatStage::new(config.format.indent.clone()));

    if config.prefix.enabled {
        let browsers = PrefixStage::browsers_from_map(&config.prefix.browsers)?;
        pipeline = pipeline.pipe(PrefixStage::new(browsers, formatter));
    }

    Ok(pipeline
        .dest(config.project.dest.clone())
        .pipe(RenameStage::new(config.rename.prefix.clone(), config.rename.suffix.clone()))
        .pipe(MinifyStage::new())
        .dest(config.project.dest.clone()))
}
