//! Site generation stage.

use super::StageError;
use crate::build::BuildContext;
use crate::tool;
use std::path::PathBuf;

/// Run the site generator from the project root.
///
/// The generator's output streams are passed through to the terminal. The
/// stage fails if the generator exits unsuccessfully or leaves no output
/// directory behind.
pub fn generate_site(ctx: &BuildContext) -> Result<Vec<PathBuf>, StageError> {
    let command = &ctx.config().generator.command;
    log::debug!("running site generator: {}", command);
    tool::run_shell(command, ctx.project_root())?;

    let out = ctx.out_dir();
    if !out.is_dir() {
        return Err(StageError::MissingOutput(out));
    }
    Ok(vec![out])
}
