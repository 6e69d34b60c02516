//! Stylesheet stage: compile Sass, then minify the resulting CSS.

use super::{read_input, write_output, StageError};
use crate::build::BuildContext;
use crate::tool;
use lightningcss::stylesheet::{MinifyOptions, ParserOptions, PrinterOptions, StyleSheet};
use std::path::PathBuf;

/// Compile the stylesheet entry and write both the plain and minified CSS.
///
/// The plain CSS lands next to the Sass sources (`dev/sass/app.css`) and the
/// minified copy under the assets directory (`assets/css/app.min.css`).
pub fn compile_styles(ctx: &BuildContext) -> Result<Vec<PathBuf>, StageError> {
    let styles = &ctx.config().styles;
    let source = read_input(&ctx.style_entry())?;

    let compiled = tool::pipe_through(&styles.compiler, ctx.project_root(), &source)?;

    let css_path = ctx.css_output();
    write_output(&css_path, &compiled)?;

    let css = String::from_utf8(compiled).map_err(|_| StageError::Css {
        path: css_path.clone(),
        message: "compiler output is not valid UTF-8".to_string(),
    })?;
    let minified =
        minify_css(&css).map_err(|message| StageError::Css { path: css_path.clone(), message })?;

    let min_path = ctx.min_css_output();
    write_output(&min_path, minified.as_bytes())?;
    log::info!("wrote {} ({} -> {} bytes)", min_path.display(), css.len(), minified.len());

    Ok(vec![css_path, min_path])
}

/// Minify a stylesheet.
pub fn minify_css(source: &str) -> Result<String, String> {
    let mut sheet =
        StyleSheet::parse(source, ParserOptions::default()).map_err(|e| e.to_string())?;
    sheet.minify(MinifyOptions::default()).map_err(|e| e.to_string())?;
    let output = sheet
        .to_css(PrinterOptions { minify: true, ..PrinterOptions::default() })
        .map_err(|e| e.to_string())?;
    Ok(output.code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minify_css_strips_whitespace() {
        let css = "body {\n  color: red;\n}\n\n.post  p {\n  margin: 0 0 1em 0;\n}\n";
        let minified = minify_css(css).unwrap();
        assert!(minified.starts_with("body{color:red}"));
        assert!(!minified.contains('\n'));
        assert!(minified.len() < css.len());
    }

    #[test]
    fn test_minify_css_empty() {
        assert_eq!(minify_css("").unwrap(), "");
    }

    #[cfg(unix)]
    mod stage {
        use super::super::*;
        use crate::config::SiteConfig;
        use std::fs;
        use tempfile::TempDir;

        fn project(compiler: &str, scss: Option<&str>) -> (TempDir, BuildContext) {
            let temp = TempDir::new().unwrap();
            if let Some(scss) = scss {
                let dir = temp.path().join("dev/sass");
                fs::create_dir_all(&dir).unwrap();
                fs::write(dir.join("app.scss"), scss).unwrap();
            }
            let mut config = SiteConfig::default();
            config.styles.compiler = compiler.to_string();
            let ctx = BuildContext::new(config, temp.path().to_path_buf());
            (temp, ctx)
        }

        #[test]
        fn test_compile_styles_writes_both_outputs() {
            let (temp, ctx) = project("cat", Some("h1 {\n  font-weight: bold;\n}\n"));

            let outputs = compile_styles(&ctx).unwrap();

            let css = temp.path().join("dev/sass/app.css");
            let min = temp.path().join("assets/css/app.min.css");
            assert_eq!(outputs, vec![css.clone(), min.clone()]);
            assert_eq!(fs::read_to_string(css).unwrap(), "h1 {\n  font-weight: bold;\n}\n");
            assert!(!fs::read_to_string(min).unwrap().contains('\n'));
        }

        #[test]
        fn test_compile_styles_compiler_failure() {
            let (temp, ctx) = project("echo 'Error: expected \"}\"' >&2; exit 65", Some("h1 {"));

            let err = compile_styles(&ctx).unwrap_err();

            assert_eq!(err.exit_code(), Some(65));
            assert!(err.to_string().contains("expected"));
            assert!(!temp.path().join("assets/css/app.min.css").exists());
        }

        #[test]
        fn test_compile_styles_missing_entry() {
            let (_temp, ctx) = project("cat", None);
            assert!(matches!(compile_styles(&ctx), Err(StageError::MissingInput(_))));
        }
    }
}
