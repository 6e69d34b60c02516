//! Command-line interface implementation
//!
//! Every pipeline stage is a subcommand of the same name. Running a stage
//! runs everything it depends on first.

mod build;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::build::Stage;
use crate::config::CliOverrides;

pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;

/// sitekit - Build, serve and publish a static blog
#[derive(Parser)]
#[command(name = "sitekit")]
#[command(about = "Build, serve and publish a static blog")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Override the generated site directory
    #[arg(long, global = true)]
    pub out: Option<PathBuf>,

    /// Override the development server port
    #[arg(long, global = true)]
    pub port: Option<u16>,

    /// Override the publish directory (a sibling of the project unless absolute)
    #[arg(long, global = true)]
    pub publish_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Minify the script entry into the asset directory
    CompileScript,
    /// Prepend the front-matter marker to the minified script
    PrependMarker,
    /// Compile the stylesheet to CSS and minified CSS
    CompileStyles,
    /// Build script assets, then run the site generator
    GenerateSite,
    /// Generate the site, then minify its HTML
    MinifyHtml,
    /// Full production build
    ProductionBuild,
    /// Build, then serve with live reload and rebuild on change
    WatchAndServe,
    /// Replace the publish directory's contents with the generated site
    PublishCopy,
    /// Production build followed by publish
    Deploy,
    /// Print the stages a command would run, in order
    Plan {
        /// Stage to plan
        stage: Stage,
    },
}

impl Commands {
    /// The pipeline stage this command runs, if it runs one.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Commands::CompileScript => Some(Stage::CompileScript),
            Commands::PrependMarker => Some(Stage::PrependMarker),
            Commands::CompileStyles => Some(Stage::CompileStyles),
            Commands::GenerateSite => Some(Stage::GenerateSite),
            Commands::MinifyHtml => Some(Stage::MinifyHtml),
            Commands::ProductionBuild => Some(Stage::ProductionBuild),
            Commands::WatchAndServe => Some(Stage::WatchAndServe),
            Commands::PublishCopy => Some(Stage::PublishCopy),
            Commands::Deploy => Some(Stage::Deploy),
            Commands::Plan { .. } => None,
        }
    }
}

/// Parse arguments and run the requested command.
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let overrides = CliOverrides { out: cli.out, port: cli.port, publish_dir: cli.publish_dir };

    match cli.command {
        Commands::Plan { stage } => build::run_plan(stage),
        command => match command.stage() {
            Some(stage) => build::run_stage(stage, &overrides, cli.verbose),
            None => ExitCode::from(EXIT_ERROR),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_every_stage_has_a_command() {
        for stage in Stage::ALL {
            let cli = Cli::try_parse_from(["sitekit", stage.name()]).unwrap();
            assert_eq!(cli.command.stage(), Some(stage));
        }
    }

    #[test]
    fn test_global_overrides() {
        let cli = Cli::try_parse_from([
            "sitekit",
            "deploy",
            "--out",
            "public",
            "--publish-dir",
            "pages",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.out, Some(PathBuf::from("public")));
        assert_eq!(cli.publish_dir, Some(PathBuf::from("pages")));
        assert_eq!(cli.port, None);
    }

    #[test]
    fn test_plan_parses_stage_name() {
        let cli = Cli::try_parse_from(["sitekit", "plan", "production-build"]).unwrap();
        assert!(matches!(cli.command, Commands::Plan { stage: Stage::ProductionBuild }));
        assert!(Cli::try_parse_from(["sitekit", "plan", "jekyll"]).is_err());
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        assert!(Cli::try_parse_from(["sitekit", "gulp"]).is_err());
    }
}
