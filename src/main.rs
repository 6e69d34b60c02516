//! sitekit - command-line build pipeline for a static blog

use std::process::ExitCode;

use sitekit::cli;

fn main() -> ExitCode {
    env_logger::init();
    cli::run()
}
