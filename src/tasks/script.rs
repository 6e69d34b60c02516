//! Script stages: minify the entry script and prepend the front-matter marker.

use super::{read_input, write_output, StageError};
use crate::build::BuildContext;
use crate::tool;
use std::path::PathBuf;

/// Pipe the script entry through the configured minifier.
///
/// Writes `<stem><suffix>.js` (e.g. `assets/js/index.min.js`).
pub fn compile_script(ctx: &BuildContext) -> Result<Vec<PathBuf>, StageError> {
    let scripts = &ctx.config().scripts;
    let source = read_input(&ctx.script_entry())?;

    let minified = tool::pipe_through(&scripts.minifier, ctx.project_root(), &source)?;

    let output = ctx.script_output();
    write_output(&output, &minified)?;
    log::info!("wrote {} ({} -> {} bytes)", output.display(), source.len(), minified.len());
    Ok(vec![output])
}

/// Prepend the marker to the minified script.
///
/// The default marker is an empty front-matter block, which makes the site
/// generator run the asset through its template engine.
pub fn prepend_marker(ctx: &BuildContext) -> Result<Vec<PathBuf>, StageError> {
    let output = ctx.script_output();
    let body = read_input(&output)?;

    let marker = ctx.config().scripts.marker.as_bytes();
    let mut contents = Vec::with_capacity(marker.len() + body.len());
    contents.extend_from_slice(marker);
    contents.extend_from_slice(&body);

    write_output(&output, &contents)?;
    Ok(vec![output])
}
