//! Configuration loading and discovery for `sitekit.toml`
//!
//! Provides functions to find, load, and merge configuration.

use super::schema::SiteConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name searched for when locating a project.
pub const CONFIG_FILE: &str = "sitekit.toml";

/// Configuration loading error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error
    #[error("Failed to parse sitekit.toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error
    #[error("Config validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    Validation(Vec<String>),
}

/// CLI arguments that can override config values
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    /// Override output directory
    pub out: Option<PathBuf>,
    /// Override serve port
    pub port: Option<u16>,
    /// Override publish target
    pub publish_dir: Option<PathBuf>,
}

/// Find sitekit.toml by walking up from the current working directory.
pub fn find_config() -> Option<PathBuf> {
    env::current_dir().ok().and_then(find_config_from)
}

/// Find sitekit.toml by walking up from a specific directory.
pub fn find_config_from(start: PathBuf) -> Option<PathBuf> {
    let mut current = start;

    loop {
        let config_path = current.join(CONFIG_FILE);
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Load configuration from a sitekit.toml file.
///
/// If a path is provided, loads from that file. Otherwise, uses `find_config()`
/// to locate the config file, falling back to the defaults when none exists.
pub fn load_config(path: Option<&Path>) -> Result<SiteConfig, ConfigError> {
    let config_path = match path {
        Some(p) => Some(p.to_path_buf()),
        None => find_config(),
    };

    match config_path {
        Some(p) => load_config_file(&p),
        None => Ok(default_config()),
    }
}

fn load_config_file(path: &Path) -> Result<SiteConfig, ConfigError> {
    log::debug!("loading config from {}", path.display());
    let contents = fs::read_to_string(path)?;
    let config: SiteConfig = toml::from_str(&contents)?;

    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors.into_iter().map(|e| e.to_string()).collect()));
    }

    Ok(config)
}

/// Configuration used when no sitekit.toml is found.
///
/// The project name is taken from the current directory name.
pub fn default_config() -> SiteConfig {
    let mut config = SiteConfig::default();
    if let Some(name) =
        env::current_dir().ok().and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
    {
        config.project.name = name;
    }
    config
}

/// Load the project configuration and its root directory.
///
/// The root is the directory holding sitekit.toml, or the current directory
/// when the defaults are used.
pub fn load_project() -> Result<(SiteConfig, PathBuf), ConfigError> {
    match find_config() {
        Some(config_path) => {
            let config = load_config_file(&config_path)?;
            let root = match project_root(&config_path) {
                Some(root) => root.to_path_buf(),
                None => env::current_dir()?,
            };
            Ok((config, root))
        }
        None => {
            log::debug!("no {} found, using defaults", CONFIG_FILE);
            Ok((default_config(), env::current_dir()?))
        }
    }
}

/// Merge CLI overrides into a configuration.
///
/// CLI arguments take precedence over config file values.
pub fn merge_cli_overrides(config: &mut SiteConfig, overrides: &CliOverrides) {
    if let Some(ref out) = overrides.out {
        config.project.out = out.clone();
    }

    if let Some(port) = overrides.port {
        config.serve.port = port;
    }

    if let Some(ref dir) = overrides.publish_dir {
        config.publish.dir = dir.clone();
    }
}

/// Get the project root directory from a config file path.
pub fn project_root(config_path: &Path) -> Option<&Path> {
    config_path.parent()
}

/// Resolve a path relative to the project root.
///
/// If the path is absolute, returns it unchanged.
/// If relative, joins it with the project root.
pub fn resolve_path(project_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        project_root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_find_config_in_current_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE);
        File::create(&config_path)
            .expect("should create config file")
            .write_all(b"[project]\nname = \"blog\"")
            .expect("should write config content");

        let found = find_config_from(temp.path().to_path_buf());
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_in_parent_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE);
        File::create(&config_path).expect("should create config file");

        let subdir = temp.path().join("_posts").join("2017");
        fs::create_dir_all(&subdir).expect("should create subdirectories");

        let found = find_config_from(subdir);
        assert_eq!(found, Some(config_path));
    }

    #[test]
    fn test_find_config_not_found() {
        let temp = TempDir::new().expect("should create temp dir");
        let found = find_config_from(temp.path().to_path_buf());
        assert_eq!(found, None);
    }

    #[test]
    fn test_load_config_from_file() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE);
        fs::write(
            &config_path,
            r#"
[project]
name = "blog"
out = "public"

[scripts]
minifier = "cat"

[publish]
dir = "pages-repo"
"#,
        )
        .expect("should write config content");

        let config = load_config(Some(&config_path)).expect("should load valid config");
        assert_eq!(config.project.name, "blog");
        assert_eq!(config.project.out, PathBuf::from("public"));
        assert_eq!(config.scripts.minifier, "cat");
        assert_eq!(config.publish.dir, PathBuf::from("pages-repo"));
    }

    #[test]
    fn test_load_config_missing_file_errors() {
        let temp = TempDir::new().expect("should create temp dir");
        let result = load_config(Some(&temp.path().join("nonexistent.toml")));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE);
        fs::write(&config_path, "this is not valid toml {{{").expect("should write config");

        let result = load_config(Some(&config_path));
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_config_validation_error() {
        let temp = TempDir::new().expect("should create temp dir");
        let config_path = temp.path().join(CONFIG_FILE);
        fs::write(&config_path, "[generator]\ncommand = \"\"\n").expect("should write config");

        let result = load_config(Some(&config_path));
        match result {
            Err(ConfigError::Validation(errors)) => {
                assert_eq!(errors.len(), 1);
                assert!(errors[0].contains("generator.command"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_merge_cli_overrides() {
        let mut config = default_config();
        let overrides = CliOverrides {
            out: Some(PathBuf::from("dist")),
            port: Some(8080),
            publish_dir: Some(PathBuf::from("elsewhere")),
        };

        merge_cli_overrides(&mut config, &overrides);
        assert_eq!(config.project.out, PathBuf::from("dist"));
        assert_eq!(config.serve.port, 8080);
        assert_eq!(config.publish.dir, PathBuf::from("elsewhere"));
    }

    #[test]
    fn test_merge_cli_overrides_empty_keeps_values() {
        let mut config = default_config();
        merge_cli_overrides(&mut config, &CliOverrides::default());
        assert_eq!(config.project.out, PathBuf::from("_site"));
        assert_eq!(config.serve.port, 3000);
    }

    #[test]
    fn test_resolve_path() {
        let root = Path::new("/project");
        assert_eq!(resolve_path(root, Path::new("/other/path")), PathBuf::from("/other/path"));
        assert_eq!(resolve_path(root, Path::new("_site")), PathBuf::from("/project/_site"));
    }

    #[test]
    fn test_project_root() {
        let config_path = Path::new("/project/sitekit.toml");
        assert_eq!(project_root(config_path), Some(Path::new("/project")));
    }

    #[test]
    #[serial]
    fn test_load_project_from_nested_dir() {
        let temp = TempDir::new().expect("should create temp dir");
        let root = temp.path().canonicalize().expect("should canonicalize");
        fs::write(root.join(CONFIG_FILE), "[project]\nname = \"blog\"\nout = \"public\"\n")
            .expect("should write config");
        let posts = root.join("_posts");
        fs::create_dir_all(&posts).expect("should create posts dir");

        let original_dir = env::current_dir().expect("should read cwd");
        env::set_current_dir(&posts).expect("should change cwd");
        let loaded = load_project();
        env::set_current_dir(original_dir).expect("should restore cwd");

        let (config, project_root) = loaded.expect("should load project");
        assert_eq!(project_root, root);
        assert_eq!(config.project.out, PathBuf::from("public"));
    }

    #[test]
    #[serial]
    fn test_load_project_defaults_without_config() {
        let temp = TempDir::new().expect("should create temp dir");
        let root = temp.path().canonicalize().expect("should canonicalize");

        let original_dir = env::current_dir().expect("should read cwd");
        env::set_current_dir(&root).expect("should change cwd");
        let loaded = load_project();
        env::set_current_dir(original_dir).expect("should restore cwd");

        let (config, project_root) = loaded.expect("should fall back to defaults");
        assert_eq!(project_root, root);
        assert_eq!(config.project.out, PathBuf::from("_site"));
    }
}
