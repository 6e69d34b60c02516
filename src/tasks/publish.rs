//! Publish stage: replace the contents of the publish repository with the
//! generated site.
//!
//! Only visible top-level entries are affected on either side, so the
//! target's `.git` directory and other dotfiles survive a publish.

use super::StageError;
use crate::build::BuildContext;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Error raised while publishing.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("generated site not found at {} (run generate-site first)", .0.display())]
    SourceMissing(PathBuf),
    #[error("publish directory {} does not exist", .0.display())]
    TargetMissing(PathBuf),
    #[error("refusing to publish {} onto itself", .0.display())]
    SameDirectory(PathBuf),
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to walk {}: {source}", .path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> PublishError + '_ {
    move |source| PublishError::Io { path: path.to_path_buf(), source }
}

/// Publish the generated site to the configured sibling directory.
pub fn publish_copy(ctx: &BuildContext) -> Result<Vec<PathBuf>, StageError> {
    Ok(publish(&ctx.out_dir(), &ctx.publish_dir())?)
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Delete the visible top-level entries of `target`, then copy the visible
/// top-level entries of `source` into it recursively.
///
/// Returns the files written to `target`.
pub fn publish(source: &Path, target: &Path) -> Result<Vec<PathBuf>, PublishError> {
    if !source.is_dir() {
        return Err(PublishError::SourceMissing(source.to_path_buf()));
    }
    if !target.is_dir() {
        return Err(PublishError::TargetMissing(target.to_path_buf()));
    }
    let source_real = source.canonicalize().map_err(io_error(source))?;
    let target_real = target.canonicalize().map_err(io_error(target))?;
    if source_real == target_real {
        return Err(PublishError::SameDirectory(target.to_path_buf()));
    }

    clear_visible(target)?;
    log::debug!("cleared {}", target.display());

    let mut copied = Vec::new();
    let walker = WalkDir::new(source)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| entry.depth() > 1 || !is_hidden(entry.file_name()));

    for entry in walker {
        let entry = entry.map_err(|err| PublishError::Walk { path: walk_path(&err), source: err })?;
        let relative = entry.path().strip_prefix(source).unwrap_or(entry.path());
        let dest = target.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&dest).map_err(io_error(&dest))?;
        } else {
            fs::copy(entry.path(), &dest).map_err(io_error(&dest))?;
            copied.push(dest);
        }
    }

    log::info!("published {} file(s) to {}", copied.len(), target.display());
    Ok(copied)
}

fn walk_path(err: &walkdir::Error) -> PathBuf {
    err.path().map(Path::to_path_buf).unwrap_or_default()
}

fn clear_visible(dir: &Path) -> Result<(), PublishError> {
    for entry in fs::read_dir(dir).map_err(io_error(dir))? {
        let entry = entry.map_err(io_error(dir))?;
        if is_hidden(&entry.file_name()) {
            continue;
        }
        let path = entry.path();
        let file_type = entry.file_type().map_err(io_error(&path))?;
        if file_type.is_dir() {
            fs::remove_dir_all(&path).map_err(io_error(&path))?;
        } else {
            fs::remove_file(&path).map_err(io_error(&path))?;
        }
    }
    Ok(())
}
