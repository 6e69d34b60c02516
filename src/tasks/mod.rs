//! Stage implementations.
//!
//! Each function performs the work of one transform or command stage and
//! returns the files it wrote. Sequencing and serving live in
//! [`crate::build`] and [`crate::serve`].

pub mod html;
pub mod publish;
pub mod script;
pub mod site;
pub mod styles;

use crate::build::{BuildContext, Stage};
use crate::tool::ToolError;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use html::{minify_html, HtmlMinifier};
pub use publish::{publish, PublishError};
pub use styles::minify_css;

/// Error that aborts a stage.
#[derive(Debug, Error)]
pub enum StageError {
    /// External tool failed
    #[error(transparent)]
    Tool(#[from] ToolError),
    /// Required input file or directory does not exist
    #[error("input not found: {}", .0.display())]
    MissingInput(PathBuf),
    /// The site generator succeeded without producing the output directory
    #[error("output directory was not created: {}", .0.display())]
    MissingOutput(PathBuf),
    /// Reading or writing a file failed
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The stylesheet compiler produced CSS that could not be minified
    #[error("invalid CSS in {}: {message}", .path.display())]
    Css { path: PathBuf, message: String },
    /// A file pattern could not be compiled
    #[error("invalid file pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    /// Publishing the site failed
    #[error(transparent)]
    Publish(#[from] PublishError),
    /// A stage with no work of its own was asked to run
    #[error("stage '{0}' has no work of its own")]
    NotRunnable(Stage),
}

impl StageError {
    /// Exit code of the external tool behind this error, if any.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            StageError::Tool(e) => e.exit_code(),
            _ => None,
        }
    }
}

/// Run the work of a single stage.
pub fn run_stage(stage: Stage, ctx: &BuildContext) -> Result<Vec<PathBuf>, StageError> {
    match stage {
        Stage::CompileScript => script::compile_script(ctx),
        Stage::PrependMarker => script::prepend_marker(ctx),
        Stage::CompileStyles => styles::compile_styles(ctx),
        Stage::GenerateSite => site::generate_site(ctx),
        Stage::MinifyHtml => html::minify_site(ctx),
        Stage::PublishCopy => publish::publish_copy(ctx),
        Stage::ProductionBuild | Stage::Deploy | Stage::WatchAndServe => {
            Err(StageError::NotRunnable(stage))
        }
    }
}

/// Read a stage input, distinguishing a missing file from other I/O errors.
pub(crate) fn read_input(path: &Path) -> Result<Vec<u8>, StageError> {
    if !path.exists() {
        return Err(StageError::MissingInput(path.to_path_buf()));
    }
    fs::read(path).map_err(|source| StageError::Io { path: path.to_path_buf(), source })
}

/// Write a stage output, creating parent directories as needed.
pub(crate) fn write_output(path: &Path, contents: &[u8]) -> Result<(), StageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|source| StageError::Io { path: parent.to_path_buf(), source })?;
    }
    fs::write(path, contents).map_err(|source| StageError::Io { path: path.to_path_buf(), source })
}
