//! Stylepipe - command-line stylesheet pipeline

use std::process::ExitCode;

use stylepipe::cli;

fn main() -> ExitCode {
    cli::run()
}
