//! Configuration schema types for `sitekit.toml`
//!
//! Defines the structure and validation rules for a site project.

use serde::Deserialize;
use std::path::PathBuf;

/// Name of the sibling directory that receives the published site.
pub const DEFAULT_PUBLISH_DIR: &str = "xiaoiver.github.io";

/// Front matter prepended to the minified script so the generator processes it.
pub const DEFAULT_MARKER: &str = "---\n---\n";

/// Project metadata section
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    #[serde(default = "default_name")]
    pub name: String,
    /// Directory the site generator writes to
    #[serde(default = "default_out")]
    pub out: PathBuf,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self { name: default_name(), out: default_out() }
    }
}

fn default_name() -> String {
    "site".to_string()
}

fn default_out() -> PathBuf {
    PathBuf::from("_site")
}

/// Script minification settings
#[derive(Debug, Clone, Deserialize)]
pub struct ScriptsConfig {
    /// Script entry file
    #[serde(default = "default_script_entry")]
    pub entry: PathBuf,
    /// Directory for the minified script
    #[serde(default = "default_script_out_dir")]
    pub out_dir: PathBuf,
    /// Minifier command (reads stdin, writes stdout)
    #[serde(default = "default_minifier")]
    pub minifier: String,
    /// Suffix added to the file stem of the output
    #[serde(default = "default_suffix")]
    pub suffix: String,
    /// Text prepended to the minified output
    #[serde(default = "default_marker")]
    pub marker: String,
}

impl Default for ScriptsConfig {
    fn default() -> Self {
        Self {
            entry: default_script_entry(),
            out_dir: default_script_out_dir(),
            minifier: default_minifier(),
            suffix: default_suffix(),
            marker: default_marker(),
        }
    }
}

fn default_script_entry() -> PathBuf {
    PathBuf::from("dev/js/index.js")
}

fn default_script_out_dir() -> PathBuf {
    PathBuf::from("assets/js")
}

fn default_minifier() -> String {
    "uglifyjs --compress --mangle".to_string()
}

fn default_suffix() -> String {
    ".min".to_string()
}

fn default_marker() -> String {
    DEFAULT_MARKER.to_string()
}

/// Stylesheet compilation settings
#[derive(Debug, Clone, Deserialize)]
pub struct StylesConfig {
    /// Stylesheet entry file
    #[serde(default = "default_style_entry")]
    pub entry: PathBuf,
    /// Directory for the unminified CSS
    #[serde(default = "default_css_dir")]
    pub css_dir: PathBuf,
    /// Directory for the minified CSS
    #[serde(default = "default_style_out_dir")]
    pub out_dir: PathBuf,
    /// Compiler command (reads stdin, writes CSS to stdout)
    #[serde(default = "default_compiler")]
    pub compiler: String,
    /// Suffix added to the file stem of the minified output
    #[serde(default = "default_suffix")]
    pub suffix: String,
}

impl Default for StylesConfig {
    fn default() -> Self {
        Self {
            entry: default_style_entry(),
            css_dir: default_css_dir(),
            out_dir: default_style_out_dir(),
            compiler: default_compiler(),
            suffix: default_suffix(),
        }
    }
}

fn default_style_entry() -> PathBuf {
    PathBuf::from("dev/sass/app.scss")
}

fn default_css_dir() -> PathBuf {
    PathBuf::from("dev/sass")
}

fn default_style_out_dir() -> PathBuf {
    PathBuf::from("assets/css")
}

fn default_compiler() -> String {
    "sass --stdin --load-path=dev/sass".to_string()
}

/// Site generator settings
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratorConfig {
    /// Shell command that builds the site into the output directory
    #[serde(default = "default_generator_command")]
    pub command: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self { command: default_generator_command() }
    }
}

fn default_generator_command() -> String {
    "jekyll build".to_string()
}

/// HTML minification flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct HtmlConfig {
    #[serde(default = "default_true")]
    pub remove_comments: bool,
    #[serde(default = "default_true")]
    pub collapse_whitespace: bool,
    #[serde(default = "default_true")]
    pub collapse_boolean_attributes: bool,
    #[serde(default = "default_true")]
    pub remove_script_type_attributes: bool,
    #[serde(default = "default_true")]
    pub remove_style_link_type_attributes: bool,
    #[serde(default = "default_true")]
    pub remove_redundant_attributes: bool,
    #[serde(default = "default_true")]
    pub remove_empty_attributes: bool,
    #[serde(default = "default_true")]
    pub remove_attribute_quotes: bool,
}

impl Default for HtmlConfig {
    fn default() -> Self {
        Self {
            remove_comments: true,
            collapse_whitespace: true,
            collapse_boolean_attributes: true,
            remove_script_type_attributes: true,
            remove_style_link_type_attributes: true,
            remove_redundant_attributes: true,
            remove_empty_attributes: true,
            remove_attribute_quotes: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Live-reload server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServeConfig {
    /// Address to bind
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind (0 picks a free port)
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self { host: default_host(), port: default_port() }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

/// Watch mode configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    /// Debounce delay in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u32,
    /// Clear terminal between rebuilds
    #[serde(default)]
    pub clear_screen: bool,
    /// Glob patterns, relative to the project root, that trigger a rebuild
    #[serde(default = "default_watch_patterns")]
    pub patterns: Vec<String>,
}

fn default_debounce_ms() -> u32 {
    100
}

fn default_watch_patterns() -> Vec<String> {
    [
        "dev/sass/*.scss",
        "assets/**/*.js",
        "dev/js/*.js",
        "_includes/**/*.html",
        "_layouts/**/*.html",
        "_posts/**/*.md",
        "index.html",
        "tags.html",
    ]
    .iter()
    .map(|p| p.to_string())
    .collect()
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            clear_screen: false,
            patterns: default_watch_patterns(),
        }
    }
}

/// Publish settings
#[derive(Debug, Clone, Deserialize)]
pub struct PublishConfig {
    /// Publish target, resolved next to the project root unless absolute
    #[serde(default = "default_publish_dir")]
    pub dir: PathBuf,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self { dir: default_publish_dir() }
    }
}

fn default_publish_dir() -> PathBuf {
    PathBuf::from(DEFAULT_PUBLISH_DIR)
}

/// Complete sitekit.toml configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub project: ProjectConfig,
    #[serde(default)]
    pub scripts: ScriptsConfig,
    #[serde(default)]
    pub styles: StylesConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub html: HtmlConfig,
    #[serde(default)]
    pub serve: ServeConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub publish: PublishConfig,
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    /// Path to the invalid field (e.g., "scripts.minifier")
    pub field: String,
    /// Error message
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sitekit.toml: '{}' {}", self.field, self.message)
    }
}

impl SiteConfig {
    /// Validate the configuration and return any errors
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut errors = Vec::new();

        let mut require = |field: &str, empty: bool| {
            if empty {
                errors.push(ConfigValidationError {
                    field: field.to_string(),
                    message: "must not be empty".to_string(),
                });
            }
        };

        require("project.out", self.project.out.as_os_str().is_empty());
        require("scripts.entry", self.scripts.entry.as_os_str().is_empty());
        require("scripts.minifier", self.scripts.minifier.trim().is_empty());
        require("styles.entry", self.styles.entry.as_os_str().is_empty());
        require("styles.compiler", self.styles.compiler.trim().is_empty());
        require("generator.command", self.generator.command.trim().is_empty());
        require("publish.dir", self.publish.dir.as_os_str().is_empty());

        if self.watch.debounce_ms == 0 {
            errors.push(ConfigValidationError {
                field: "watch.debounce_ms".to_string(),
                message: "must be a positive integer".to_string(),
            });
        }

        for (i, pattern) in self.watch.patterns.iter().enumerate() {
            if let Err(e) = glob::Pattern::new(pattern) {
                errors.push(ConfigValidationError {
                    field: format!("watch.patterns[{}]", i),
                    message: format!("is not a valid glob: {}", e),
                });
            }
        }

        errors
    }
}
