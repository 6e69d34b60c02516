//! HTML minification.
//!
//! A small regex-driven minifier. The document is split into markup, text,
//! comments and raw blocks (`pre`, `textarea`, `script`, `style`). Raw block
//! bodies are never touched; everything else is rewritten according to
//! [`HtmlConfig`].

use super::StageError;
use crate::build::BuildContext;
use crate::config::HtmlConfig;
use regex::{Captures, Regex};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static RAW_OR_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<!--.*?-->|<pre\b.*?</pre\s*>|<textarea\b.*?</textarea\s*>|<script\b.*?</script\s*>|<style\b.*?</style\s*>",
    )
    .expect("raw block pattern is valid")
});

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[a-zA-Z/!][^<>]*>").expect("tag pattern is valid"));

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(\s+)([^\s"'=<>/]+)(?:\s*=\s*("[^"]*"|'[^']*'|[^\s"'=<>`]+))?"#)
        .expect("attribute pattern is valid")
});

static UNQUOTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[^ \t\n\x0C\r"'`=<>]+$"#).expect("unquoted value pattern is valid")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\n\r\x0C]+").expect("whitespace pattern is valid"));

/// Elements around which whitespace carries no meaning.
const BLOCK_TAGS: &[&str] = &[
    "!doctype", "address", "article", "aside", "base", "blockquote", "body", "dd", "details",
    "dialog", "div", "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "h1", "h2",
    "h3", "h4", "h5", "h6", "head", "header", "hr", "html", "li", "link", "main", "meta", "nav",
    "noscript", "ol", "p", "section", "summary", "table", "tbody", "td", "tfoot", "th", "thead",
    "title", "tr", "ul",
];

const BOOLEAN_ATTRIBUTES: &[&str] = &[
    "allowfullscreen",
    "async",
    "autofocus",
    "autoplay",
    "checked",
    "controls",
    "default",
    "defer",
    "disabled",
    "formnovalidate",
    "hidden",
    "ismap",
    "loop",
    "multiple",
    "muted",
    "nomodule",
    "novalidate",
    "open",
    "readonly",
    "required",
    "reversed",
    "selected",
];

const EMPTY_REMOVABLE_ATTRIBUTES: &[&str] = &["class", "dir", "id", "lang", "style", "title"];

/// `(element, attribute, value)` triples the browser applies by default.
const REDUNDANT_ATTRIBUTES: &[(&str, &str, &str)] = &[
    ("area", "shape", "rect"),
    ("form", "method", "get"),
    ("input", "type", "text"),
    ("script", "language", "javascript"),
];

#[derive(Debug)]
enum Piece {
    Text(String),
    Tag { html: String, block: bool },
    Raw { html: String, block: bool },
    Comment(String),
}

impl Piece {
    fn is_block(&self) -> bool {
        match self {
            Piece::Tag { block, .. } | Piece::Raw { block, .. } => *block,
            Piece::Text(_) | Piece::Comment(_) => false,
        }
    }
}

/// Minifies HTML documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlMinifier {
    options: HtmlConfig,
}

impl HtmlMinifier {
    pub fn new(options: HtmlConfig) -> Self {
        Self { options }
    }

    /// Minify a document.
    pub fn minify(&self, html: &str) -> String {
        let pieces = self.tokenize(html);
        self.render(&pieces)
    }

    fn tokenize(&self, html: &str) -> Vec<Piece> {
        let mut pieces = Vec::new();
        let mut last = 0;

        for m in RAW_OR_COMMENT.find_iter(html) {
            self.push_markup(&mut pieces, &html[last..m.start()]);
            let text = m.as_str();
            if text.starts_with("<!--") {
                // Conditional comments carry markup for old browsers
                if !self.options.remove_comments || text.starts_with("<!--[") {
                    pieces.push(Piece::Comment(text.to_string()));
                }
            } else {
                let name = tag_name(text);
                let (open, body) = match text.find('>') {
                    Some(end) => text.split_at(end + 1),
                    None => (text, ""),
                };
                pieces.push(Piece::Raw {
                    html: format!("{}{}", self.process_tag(open), body),
                    block: name == "script" || name == "style",
                });
            }
            last = m.end();
        }
        self.push_markup(&mut pieces, &html[last..]);

        pieces
    }

    fn push_markup(&self, pieces: &mut Vec<Piece>, markup: &str) {
        let mut last = 0;
        for m in TAG.find_iter(markup) {
            push_text(pieces, &markup[last..m.start()]);
            let tag = m.as_str();
            pieces.push(Piece::Tag {
                html: self.process_tag(tag),
                block: BLOCK_TAGS.contains(&tag_name(tag).as_str()),
            });
            last = m.end();
        }
        push_text(pieces, &markup[last..]);
    }

    fn render(&self, pieces: &[Piece]) -> String {
        let mut out = String::new();
        for (i, piece) in pieces.iter().enumerate() {
            match piece {
                Piece::Text(text) if self.options.collapse_whitespace => {
                    let collapsed = WHITESPACE.replace_all(text, " ");
                    let mut text: &str = &collapsed;
                    if i == 0 || pieces[i - 1].is_block() {
                        text = text.trim_start_matches(' ');
                    }
                    if i + 1 == pieces.len() || pieces[i + 1].is_block() {
                        text = text.trim_end_matches(' ');
                    }
                    out.push_str(text);
                }
                Piece::Text(html)
                | Piece::Tag { html, .. }
                | Piece::Raw { html, .. }
                | Piece::Comment(html) => out.push_str(html),
            }
        }
        out
    }

    /// Rewrite the attributes of an opening tag.
    fn process_tag(&self, tag: &str) -> String {
        if tag.starts_with("</") || tag.starts_with("<!") {
            return tag.to_string();
        }
        let name = tag_name(tag);
        let self_closing = tag.ends_with("/>");
        let options = self.options;

        ATTRIBUTE
            .replace_all(tag, |caps: &Captures| {
                let attr = caps[2].to_ascii_lowercase();
                if let Some(raw) = caps.get(3).map(|v| unquote(v.as_str())) {
                    let value = raw.trim();
                    let empty = value.is_empty() && is_empty_removable(&attr);
                    if options.remove_empty_attributes && empty {
                        return String::new();
                    }
                    if options.remove_redundant_attributes && is_redundant(&name, &attr, value) {
                        return String::new();
                    }
                    if is_default_type(&options, &name, &attr, value) {
                        return String::new();
                    }
                    if options.collapse_boolean_attributes && is_collapsible(&attr, value) {
                        return format!("{}{}", &caps[1], &caps[2]);
                    }
                    if options.remove_attribute_quotes && !self_closing && UNQUOTED.is_match(raw) {
                        return format!("{}{}={}", &caps[1], &caps[2], raw);
                    }
                }
                caps[0].to_string()
            })
            .into_owned()
    }
}

/// Attributes that mean nothing when empty.
fn is_empty_removable(attr: &str) -> bool {
    EMPTY_REMOVABLE_ATTRIBUTES.contains(&attr) || attr.starts_with("on")
}

/// Attributes set to the value the browser assumes anyway.
fn is_redundant(tag: &str, attr: &str, value: &str) -> bool {
    REDUNDANT_ATTRIBUTES
        .iter()
        .any(|(t, a, v)| *t == tag && *a == attr && value.eq_ignore_ascii_case(v))
}

fn is_default_type(options: &HtmlConfig, tag: &str, attr: &str, value: &str) -> bool {
    if attr != "type" {
        return false;
    }
    (options.remove_script_type_attributes
        && tag == "script"
        && value.eq_ignore_ascii_case("text/javascript"))
        || (options.remove_style_link_type_attributes
            && (tag == "style" || tag == "link")
            && value.eq_ignore_ascii_case("text/css"))
}

/// Boolean attributes whose value can go. `hidden` also takes the
/// `until-found` state, so only its plain forms collapse.
fn is_collapsible(attr: &str, value: &str) -> bool {
    if attr == "hidden" {
        return value.is_empty() || value.eq_ignore_ascii_case("hidden");
    }
    BOOLEAN_ATTRIBUTES.contains(&attr)
}

fn push_text(pieces: &mut Vec<Piece>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Piece::Text(previous)) = pieces.last_mut() {
        previous.push_str(text);
    } else {
        pieces.push(Piece::Text(text.to_string()));
    }
}

/// Lowercased element name of a tag, e.g. `div` for `</DIV>`.
fn tag_name(tag: &str) -> String {
    tag.trim_start_matches('<')
        .trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '!')
        .collect::<String>()
        .to_ascii_lowercase()
}

fn unquote(value: &str) -> &str {
    value.trim_matches(|c| c == '"' || c == '\'')
}

/// Minify a document with the given options.
pub fn minify_html(html: &str, options: HtmlConfig) -> String {
    HtmlMinifier::new(options).minify(html)
}

/// Find every HTML file under `dir`, sorted.
fn discover_html(dir: &Path) -> Result<Vec<PathBuf>, StageError> {
    let pattern = format!("{}/**/*.html", glob::Pattern::escape(&dir.to_string_lossy()));
    let paths = glob::glob(&pattern)
        .map_err(|source| StageError::Pattern { pattern: pattern.clone(), source })?;

    let mut files = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => log::warn!("skipping unreadable path: {}", e),
        }
    }
    files.sort();
    Ok(files)
}

/// Minify every HTML file in the generated site in place.
pub fn minify_site(ctx: &BuildContext) -> Result<Vec<PathBuf>, StageError> {
    let out = ctx.out_dir();
    if !out.is_dir() {
        return Err(StageError::MissingInput(out));
    }

    let minifier = HtmlMinifier::new(ctx.config().html);
    let files = discover_html(&out)?;
    if files.is_empty() {
        log::warn!("no HTML files found in {}", out.display());
    }

    let mut written = Vec::new();
    for path in files {
        let html = fs::read_to_string(&path)
            .map_err(|source| StageError::Io { path: path.clone(), source })?;
        let minified = minifier.minify(&html);
        if minified != html {
            fs::write(&path, minified)
                .map_err(|source| StageError::Io { path: path.clone(), source })?;
            written.push(path);
        }
    }
    log::info!("minified {} HTML file(s)", written.len());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use tempfile::TempDir;

    fn minify(html: &str) -> String {
        minify_html(html, HtmlConfig::default())
    }

    #[test]
    fn test_removes_comments() {
        assert_eq!(minify("<p>a<!-- note -->b</p>"), "<p>ab</p>");
    }

    #[test]
    fn test_keeps_conditional_comments() {
        let html = "<head><!--[if lt IE 9]><script src=\"shiv.js\"></script><![endif]--></head>";
        assert_eq!(minify(html), html);
    }

    #[test]
    fn test_keeps_comments_when_disabled() {
        let options = HtmlConfig { remove_comments: false, ..HtmlConfig::default() };
        assert_eq!(minify_html("<p>a<!-- x -->b</p>", options), "<p>a<!-- x -->b</p>");
    }

    #[test]
    fn test_collapses_whitespace() {
        let html = "<!DOCTYPE html>\n<html>\n  <body>\n    <p>Hello,\n      <em>world</em>  again</p>\n  </body>\n</html>\n";
        assert_eq!(
            minify(html),
            "<!DOCTYPE html><html><body><p>Hello, <em>world</em> again</p></body></html>"
        );
    }

    #[test]
    fn test_whitespace_kept_when_disabled() {
        let options = HtmlConfig { collapse_whitespace: false, ..HtmlConfig::default() };
        let html = "<div>\n  <p>x</p>\n</div>";
        assert_eq!(minify_html(html, options), html);
    }

    #[test]
    fn test_preserves_raw_blocks() {
        let html = "<div>\n<pre>  line 1\n    line 2</pre>\n<textarea>  a  </textarea></div>";
        assert_eq!(minify(html), "<div><pre>  line 1\n    line 2</pre> <textarea>  a  </textarea></div>");
    }

    #[test]
    fn test_script_body_untouched() {
        let html = "<body>\n  <script>\n  // keep <!-- this -->\n  var a  =  1;\n  </script>\n</body>";
        assert_eq!(
            minify(html),
            "<body><script>\n  // keep <!-- this -->\n  var a  =  1;\n  </script></body>"
        );
    }

    #[test]
    fn test_removes_default_type_attributes() {
        assert_eq!(
            minify("<script type=\"text/javascript\" src=\"a.js\"></script>"),
            "<script src=a.js></script>"
        );
        assert_eq!(
            minify("<link rel=\"stylesheet\" type=\"text/css\" href=\"a.css\">"),
            "<link rel=stylesheet href=a.css>"
        );
        assert_eq!(minify("<style type='TEXT/CSS'>p{}</style>"), "<style>p{}</style>");
        assert_eq!(
            minify("<script type=\"module\" src=\"m.js\"></script>"),
            "<script type=module src=m.js></script>"
        );
    }

    #[test]
    fn test_type_attributes_kept_when_disabled() {
        let options = HtmlConfig {
            remove_script_type_attributes: false,
            remove_style_link_type_attributes: false,
            remove_attribute_quotes: false,
            ..HtmlConfig::default()
        };
        let html = "<script type=\"text/javascript\"></script>";
        assert_eq!(minify_html(html, options), html);
    }

    #[test]
    fn test_collapses_boolean_attributes() {
        assert_eq!(
            minify("<input type=\"checkbox\" checked=\"checked\" disabled=\"\">"),
            "<input type=checkbox checked disabled>"
        );
        assert_eq!(minify("<script defer=\"defer\" src=\"a.js\"></script>"), "<script defer src=a.js></script>");
    }

    #[test]
    fn test_hidden_until_found_keeps_its_value() {
        assert_eq!(minify("<div hidden=\"hidden\">x</div>"), "<div hidden>x</div>");
        assert_eq!(minify("<div hidden=\"until-found\">x</div>"), "<div hidden=until-found>x</div>");
    }

    #[test]
    fn test_removes_redundant_attributes() {
        assert_eq!(
            minify("<form method=\"get\" action=\"/search\"><input type=\"text\" name=\"q\"></form>"),
            "<form action=/search><input name=q></form>"
        );
        assert_eq!(
            minify("<script language=\"JavaScript\" src=\"a.js\"></script>"),
            "<script src=a.js></script>"
        );
        assert_eq!(minify("<area shape=\"rect\" href=\"#a\">"), "<area href=#a>");
        assert_eq!(minify("<form method=\"post\"></form>"), "<form method=post></form>");
        assert_eq!(minify("<input type=\"email\">"), "<input type=email>");
    }

    #[test]
    fn test_redundant_attributes_kept_when_disabled() {
        let options = HtmlConfig { remove_redundant_attributes: false, ..HtmlConfig::default() };
        assert_eq!(minify_html("<input type=\"text\">", options), "<input type=text>");
    }

    #[test]
    fn test_removes_empty_attributes() {
        assert_eq!(
            minify("<form method=\"get\"><input type=\"text\" class=\"\" name=\"q\"></form><a href=\"/\" id=\"\">x</a>"),
            "<form><input name=q></form><a href=/>x</a>"
        );
        assert_eq!(
            minify("<p style=\"\" onclick=\" \" title=''>x</p>"),
            "<p>x</p>"
        );
        assert_eq!(minify("<input value=\"\" alt=\"\">"), "<input value=\"\" alt=\"\">");
    }

    #[test]
    fn test_empty_attributes_kept_when_disabled() {
        let options = HtmlConfig { remove_empty_attributes: false, ..HtmlConfig::default() };
        assert_eq!(minify_html("<p class=\"\">x</p>", options), "<p class=\"\">x</p>");
    }

    #[test]
    fn test_attribute_quotes() {
        assert_eq!(minify("<a href=\"/2019/01/post.html\">x</a>"), "<a href=/2019/01/post.html>x</a>");
        assert_eq!(minify("<img alt=\"a=b\" src='x.png'>"), "<img alt=\"a=b\" src=x.png>");
        assert_eq!(minify("<br class=\"a\"/>"), "<br class=\"a\"/>");

        let options = HtmlConfig { remove_attribute_quotes: false, ..HtmlConfig::default() };
        assert_eq!(minify_html("<a href=\"/\">x</a>", options), "<a href=\"/\">x</a>");
    }

    #[test]
    fn test_attribute_values_are_not_collapsed() {
        let html = "<p title=\"a   b\">x</p>";
        assert_eq!(minify(html), html);
    }

    #[test]
    fn test_text_with_angle_brackets() {
        assert_eq!(minify("<p>1 < 2 and 3 > 2</p>"), "<p>1 < 2 and 3 > 2</p>");
    }

    #[test]
    fn test_minify_site_rewrites_html_files() {
        let temp = TempDir::new().unwrap();
        let site = temp.path().join("_site");
        fs::create_dir_all(site.join("2019/01")).unwrap();
        fs::write(site.join("index.html"), "<p>\n  hi <!-- c -->\n</p>").unwrap();
        fs::write(site.join("2019/01/post.html"), "<div>\n <p>post</p>\n</div>").unwrap();
        fs::write(site.join("feed.xml"), "<feed>\n  <!-- keep -->\n</feed>").unwrap();
        fs::write(site.join("small.html"), "<p>x</p>").unwrap();

        let ctx = BuildContext::new(SiteConfig::default(), temp.path().to_path_buf());
        let written = minify_site(&ctx).unwrap();

        assert_eq!(written, vec![site.join("2019/01/post.html"), site.join("index.html")]);
        assert_eq!(fs::read_to_string(site.join("index.html")).unwrap(), "<p>hi</p>");
        assert_eq!(fs::read_to_string(site.join("2019/01/post.html")).unwrap(), "<div><p>post</p></div>");
        assert_eq!(fs::read_to_string(site.join("feed.xml")).unwrap(), "<feed>\n  <!-- keep -->\n</feed>");
    }

    #[test]
    fn test_minify_site_requires_output_dir() {
        let temp = TempDir::new().unwrap();
        let ctx = BuildContext::new(SiteConfig::default(), temp.path().to_path_buf());
        assert!(matches!(minify_site(&ctx), Err(StageError::MissingInput(_))));
    }
}
