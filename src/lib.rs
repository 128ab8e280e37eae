//! Stylepipe - Library for building stylesheets
//!
//! This library provides functionality to:
//! - Compile SCSS/Sass sources to CSS
//! - Normalize, format and vendor-prefix the result
//! - Write a readable and a minified copy of every entry file
//! - Run named tasks and rerun them when sources change

pub mod build;
pub mod cli;
pub mod config;
pub mod css;
pub mod output;
pub mod record;
pub mod stage;
pub mod task;
pub mod watch;
