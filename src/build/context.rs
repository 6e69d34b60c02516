//! Build context containing configuration and resolved paths for a run.

use crate::config::SiteConfig;
use std::path::{Path, PathBuf};

/// Build context containing configuration and paths for a pipeline run.
///
/// Every path in the configuration is relative to the project root, except
/// the publish target which is resolved next to it.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// The loaded configuration
    config: SiteConfig,
    /// Project root directory (where sitekit.toml is located)
    project_root: PathBuf,
    /// Whether to run in verbose mode
    verbose: bool,
}

impl BuildContext {
    /// Create a new build context.
    pub fn new(config: SiteConfig, project_root: PathBuf) -> Self {
        Self { config, project_root, verbose: false }
    }

    /// Get the configuration.
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    /// Get the project root directory.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Whether verbose mode is enabled.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Set verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Resolve a path relative to the project root.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        crate::config::loader::resolve_path(&self.project_root, path)
    }

    /// Directory the site generator writes to.
    pub fn out_dir(&self) -> PathBuf {
        self.resolve_path(&self.config.project.out)
    }

    /// Script entry file.
    pub fn script_entry(&self) -> PathBuf {
        self.resolve_path(&self.config.scripts.entry)
    }

    /// Minified script, e.g. `assets/js/index.min.js`.
    pub fn script_output(&self) -> PathBuf {
        let scripts = &self.config.scripts;
        let dir = self.resolve_path(&scripts.out_dir);
        dir.join(suffixed_name(&scripts.entry, &scripts.suffix, "js"))
    }

    /// Stylesheet entry file.
    pub fn style_entry(&self) -> PathBuf {
        self.resolve_path(&self.config.styles.entry)
    }

    /// Unminified compiled CSS, e.g. `dev/sass/app.css`.
    pub fn css_output(&self) -> PathBuf {
        let styles = &self.config.styles;
        self.resolve_path(&styles.css_dir).join(suffixed_name(&styles.entry, "", "css"))
    }

    /// Minified CSS, e.g. `assets/css/app.min.css`.
    pub fn min_css_output(&self) -> PathBuf {
        let styles = &self.config.styles;
        self.resolve_path(&styles.out_dir).join(suffixed_name(&styles.entry, &styles.suffix, "css"))
    }

    /// Publish target directory.
    ///
    /// A relative `publish.dir` names a sibling of the project root.
    pub fn publish_dir(&self) -> PathBuf {
        let dir = &self.config.publish.dir;
        if dir.is_absolute() {
            return dir.clone();
        }
        match self.project_root.parent() {
            Some(parent) => parent.join(dir),
            None => self.project_root.join(dir),
        }
    }

    /// Files written by the pipeline's asset stages.
    ///
    /// The watcher ignores changes to these so a rebuild does not trigger
    /// itself.
    pub fn generated_files(&self) -> Vec<PathBuf> {
        vec![self.script_output(), self.css_output(), self.min_css_output()]
    }
}

/// File name of `source` with `suffix` added to the stem and the extension
/// replaced by `extension`.
///
/// ```ignore
/// assert_eq!(suffixed_name(Path::new("dev/js/index.js"), ".min", "js"), "index.min.js");
/// ```
pub fn suffixed_name(source: &Path, suffix: &str, extension: &str) -> String {
    let stem = source.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    format!("{}{}.{}", stem, suffix, extension)
}
