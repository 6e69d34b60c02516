//! Watch mode for automatic rebuilds on file changes.
//!
//! Backs the `watch-and-serve` stage: after the initial build, the output
//! directory is served with live reload while the project is watched. Each
//! batch of relevant changes re-runs site generation (and the stylesheet
//! stage when Sass sources changed), then tells connected browsers to reload.

use crate::build::{BuildContext, Pipeline, ProgressEvent, Stage, StagePlan};
use crate::serve::{LiveServer, ServeError};
use glob::{MatchOptions, Pattern};
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Error during watch mode.
#[derive(Debug, Error)]
pub enum WatchError {
    /// Failed to initialize file watcher
    #[error("failed to initialize file watcher: {0}")]
    WatcherInit(#[source] notify::Error),
    /// Failed to add watch path
    #[error("failed to watch path: {0}")]
    WatchPath(#[source] notify::Error),
    /// A watch pattern is not a valid glob
    #[error("invalid watch pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
    /// The live-reload server could not start
    #[error(transparent)]
    Serve(#[from] ServeError),
    /// The watcher stopped delivering events
    #[error("file watcher disconnected")]
    ChannelClosed,
}

/// A message from the file watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchMessage {
    /// Paths that changed during one debounce window
    Changed(Vec<PathBuf>),
    /// A non-fatal watcher error
    Error(String),
}

/// Decides which changed paths should trigger a rebuild.
#[derive(Debug, Clone)]
pub struct WatchMatcher {
    root: PathBuf,
    patterns: Vec<Pattern>,
    ignored_files: Vec<PathBuf>,
    ignored_dirs: Vec<PathBuf>,
}

impl WatchMatcher {
    /// Build a matcher from the watch patterns of a project.
    ///
    /// Files the pipeline writes itself and everything under the output
    /// directory are ignored so a rebuild never triggers another one.
    pub fn new(ctx: &BuildContext) -> Result<Self, WatchError> {
        let patterns = ctx
            .config()
            .watch
            .patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|source| WatchError::Pattern { pattern: p.clone(), source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            root: canonical(ctx.project_root()),
            patterns,
            ignored_files: ctx.generated_files().iter().map(|p| canonical(p)).collect(),
            ignored_dirs: vec![canonical(&ctx.out_dir())],
        })
    }

    /// Check if a changed path should trigger a rebuild.
    pub fn matches(&self, path: &Path) -> bool {
        let path = canonical(path);
        if self.ignored_files.contains(&path) || self.ignored_dirs.iter().any(|d| path.starts_with(d))
        {
            return false;
        }
        let Ok(relative) = path.strip_prefix(&self.root) else {
            return false;
        };

        let options = MatchOptions { require_literal_separator: true, ..MatchOptions::new() };
        self.patterns.iter().any(|p| p.matches_path_with(relative, options))
    }
}

/// Canonicalize a path, falling back to its parent for files that no longer
/// exist (e.g. deleted sources).
fn canonical(path: &Path) -> PathBuf {
    if let Ok(real) = path.canonicalize() {
        return real;
    }
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => canonical(parent).join(name),
        _ => path.to_path_buf(),
    }
}

/// Stages to re-run for a batch of changed files.
pub fn rebuild_plan(changed: &[PathBuf]) -> StagePlan {
    let styles_changed =
        changed.iter().any(|p| p.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("scss")));

    let mut targets = Vec::new();
    if styles_changed {
        targets.push(Stage::CompileStyles);
    }
    targets.push(Stage::GenerateSite);
    StagePlan::for_stages(&targets)
}

/// Receive change batches until the watcher disconnects.
///
/// Messages that queue up while `on_change` runs are drained and merged, so
/// a burst of changes produces one call. Paths rejected by `matcher` are
/// dropped; batches with no remaining paths do not call `on_change`.
pub fn watch_loop<F>(
    rx: &Receiver<WatchMessage>,
    matcher: &WatchMatcher,
    mut on_change: F,
) -> Result<(), WatchError>
where
    F: FnMut(&[PathBuf]),
{
    loop {
        let first = rx.recv().map_err(|_| WatchError::ChannelClosed)?;
        let mut batch = vec![first];
        while let Ok(message) = rx.try_recv() {
            batch.push(message);
        }

        let mut changed: Vec<PathBuf> = Vec::new();
        for message in batch {
            match message {
                WatchMessage::Changed(paths) => {
                    for path in paths {
                        if matcher.matches(&path) && !changed.contains(&path) {
                            changed.push(path);
                        }
                    }
                }
                WatchMessage::Error(error) => {
                    log::warn!("watch error: {}", error);
                }
            }
        }

        if !changed.is_empty() {
            on_change(&changed);
        }
    }
}

/// Clear the terminal screen
fn clear_screen() {
    print!("\x1B[2J\x1B[1;1H");
}

fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{}ms", millis)
    } else {
        format!("{:.2}s", duration.as_secs_f64())
    }
}

/// Get current timestamp for logging
fn timestamp() -> String {
    use std::time::SystemTime;
    let now = SystemTime::now().duration_since(SystemTime::UNIX_EPOCH).unwrap_or_default();
    let secs = now.as_secs() % 86400;
    let hours = (secs / 3600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}

/// Serve the output directory and rebuild on changes.
///
/// Expects the initial build to have run already. Blocks until the watcher
/// fails; in normal use it runs until the process is interrupted.
pub fn watch_and_serve(pipeline: &Pipeline) -> Result<(), WatchError> {
    let ctx = pipeline.context();
    let config = ctx.config();
    let root = ctx.project_root();

    let server = LiveServer::start(&ctx.out_dir(), &config.serve.host, config.serve.port)?;
    println!("[{}] Serving {} at {}", timestamp(), config.project.out.display(), server.url());

    let matcher = WatchMatcher::new(ctx)?;

    let (tx, rx) = channel();
    let debounce = Duration::from_millis(u64::from(config.watch.debounce_ms));
    let mut debouncer = new_debouncer(debounce, move |result: DebounceEventResult| {
        let message = match result {
            Ok(events) => WatchMessage::Changed(events.into_iter().map(|e| e.path).collect()),
            Err(error) => WatchMessage::Error(format!("{:?}", error)),
        };
        let _ = tx.send(message);
    })
    .map_err(WatchError::WatcherInit)?;

    debouncer.watcher().watch(root, RecursiveMode::Recursive).map_err(WatchError::WatchPath)?;
    println!("[{}] Watching {} for changes...", timestamp(), root.display());

    watch_loop(&rx, &matcher, |changed| {
        for path in changed {
            let shown = path.strip_prefix(root).unwrap_or(path);
            println!("[{}] Changed: {}", timestamp(), shown.display());
        }
        if config.watch.clear_screen {
            clear_screen();
        }

        let start = Instant::now();
        let result = pipeline.run_plan(&rebuild_plan(changed));
        if result.is_success() {
            let clients = server.reload();
            println!(
                "[{}] Rebuilt in {}, reloaded {} browser{}",
                timestamp(),
                format_duration(start.elapsed()),
                clients,
                if clients == 1 { "" } else { "s" }
            );
        } else {
            pipeline.report(ProgressEvent::Error {
                stage: result.first_failure().map(|failure| failure.stage),
                message: format!("[{}] rebuild failed; still watching", timestamp()),
            });
        }
    })
}
