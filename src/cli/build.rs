//! Stage command implementations (every stage subcommand, plus plan)

use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;

use super::{EXIT_ERROR, EXIT_SUCCESS};
use crate::build::{BuildContext, ConsoleProgress, Pipeline, Stage, StageKind, StagePlan};
use crate::config::loader::{merge_cli_overrides, CONFIG_FILE};
use crate::config::{load_project, CliOverrides};

/// Load the project and apply command-line overrides.
fn load_context(overrides: &CliOverrides, verbose: bool) -> Result<BuildContext, ExitCode> {
    let (mut config, project_root) = match load_project() {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error loading {}: {}", CONFIG_FILE, e);
            return Err(ExitCode::from(EXIT_ERROR));
        }
    };
    merge_cli_overrides(&mut config, overrides);

    let errors = config.validate();
    if !errors.is_empty() {
        for error in errors {
            eprintln!("Error: {}", error);
        }
        return Err(ExitCode::from(EXIT_ERROR));
    }

    if verbose {
        println!("Project root: {}", project_root.display());
    }
    Ok(BuildContext::new(config, project_root).with_verbose(verbose))
}

/// Run a stage and its prerequisites.
///
/// The serve stage keeps running after its prerequisites complete.
pub fn run_stage(stage: Stage, overrides: &CliOverrides, verbose: bool) -> ExitCode {
    let context = match load_context(overrides, verbose) {
        Ok(context) => context,
        Err(code) => return code,
    };

    let reporter = ConsoleProgress::new()
        .with_colors(std::io::stderr().is_terminal())
        .with_verbose(verbose);
    let pipeline = Pipeline::new(context).with_reporter(Arc::new(reporter));

    let result = pipeline.run(stage);
    if !result.is_success() {
        eprintln!("{}", result.summary());
        return ExitCode::from(result.exit_code());
    }
    if verbose {
        println!("{}", result.summary());
        for output in result.all_outputs() {
            println!("  wrote {}", output.display());
        }
    }

    if stage.kind() == StageKind::Serve {
        println!("Press Ctrl+C to stop");
        if let Err(e) = crate::watch::watch_and_serve(&pipeline) {
            eprintln!("Watch error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    }

    ExitCode::from(EXIT_SUCCESS)
}

/// Print the execution order for a stage.
pub fn run_plan(stage: Stage) -> ExitCode {
    let plan = StagePlan::for_stage(stage);
    for (i, planned) in plan.stages().iter().enumerate() {
        println!(
            "{:>2}. {:<16} {:<9} {}",
            i + 1,
            planned.name(),
            planned.kind().to_string(),
            planned.description()
        );
    }
    ExitCode::from(EXIT_SUCCESS)
}
