use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use markdown::escape_html;
use markdown::parsers::ConversionConfig;
use persistance::fs::{get_templates_location, parse_location, Config, ConfigError};
use render::{
    index_page, merge_server_template, not_found_page, render_document, IndexEntry, TemplateStore,
};
use warp::http::StatusCode;

/// Everything a request needs, resolved once at server start. Configuration
/// changes take effect on the next start.
#[derive(Debug, Clone)]
pub struct ServerContext {
    pub host: String,
    pub port: u16,
    pub charset: String,
    pub default_root: PathBuf,
    pub root_dirs: BTreeMap<String, PathBuf>,
    pub conversion: ConversionConfig,
    pub templates: TemplateStore,
}

impl ServerContext {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(ServerContext {
            host: config.server.host.clone(),
            port: config.server.port,
            charset: config.server.charset.clone(),
            default_root: parse_location(&config.general.document_root),
            root_dirs: config
                .server
                .root_dirs
                .iter()
                .map(|(label, dir)| (label.clone(), parse_location(dir)))
                .collect(),
            conversion: config.general.conversion_config(),
            templates: TemplateStore::new(get_templates_location()?),
        })
    }
}

/// Extensions the server is willing to serve and list.
fn is_served_file(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref(),
        Some("md" | "markdown" | "txt" | "html" | "htm")
    )
}

fn is_raw_html(path: &Path) -> bool {
    matches!(
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .as_deref(),
        Some("html" | "htm")
    )
}

/// Maps a decoded URL path onto the filesystem. `..` segments are clamped,
/// so the result never escapes the chosen root. A first segment matching a
/// configured root label selects that root.
fn resolve_path(ctx: &ServerContext, path: &str) -> PathBuf {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    let (mut resolved, rest) = match segments.split_first() {
        Some((first, rest)) if ctx.root_dirs.contains_key(*first) => {
            (ctx.root_dirs[*first].clone(), rest)
        }
        _ => (ctx.default_root.clone(), &segments[..]),
    };
    for segment in rest {
        resolved.push(segment);
    }
    resolved
}

pub(crate) fn handle_get(ctx: &ServerContext, raw_path: &str) -> (StatusCode, String) {
    let decoded = match urlencoding::decode(raw_path) {
        Ok(decoded) => decoded.into_owned(),
        Err(err) => {
            log::warn!("undecodable request path {}: {}", raw_path, err);
            return (
                StatusCode::NOT_FOUND,
                not_found_page(raw_path, &ctx.charset),
            );
        }
    };
    let path = decoded.split('?').next().unwrap_or_default();
    let fs_path = resolve_path(ctx, path);
    log::debug!("GET {} -> {:?}", path, fs_path);

    if !fs_path.exists() {
        return (StatusCode::NOT_FOUND, not_found_page(path, &ctx.charset));
    }
    if fs_path.is_dir() {
        let index = fs_path.join("index.md");
        if index.is_file() {
            return render_file(ctx, &index);
        }
        return directory_listing(ctx, path, &fs_path);
    }
    if !is_served_file(&fs_path) {
        return (StatusCode::NOT_FOUND, not_found_page(path, &ctx.charset));
    }
    if is_raw_html(&fs_path) {
        return match fs::read_to_string(&fs_path) {
            Ok(raw) => (StatusCode::OK, raw),
            Err(err) => read_error(ctx, path, err),
        };
    }
    render_file(ctx, &fs_path)
}

/// Converts a Markdown or text file and wraps it in the server shell when
/// the document template did not already produce a full page.
fn render_file(ctx: &ServerContext, fs_path: &Path) -> (StatusCode, String) {
    let text = match fs::read_to_string(fs_path) {
        Ok(text) => text,
        Err(err) => return read_error(ctx, &fs_path.to_string_lossy(), err),
    };
    let rendered = render_document(&text, &ctx.conversion, &ctx.templates);
    if rendered.html.to_lowercase().contains("</html>") {
        return (StatusCode::OK, rendered.html);
    }
    let title = if rendered.meta.title.is_empty() {
        fs_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled".into())
    } else {
        rendered.meta.title.clone()
    };
    (
        StatusCode::OK,
        merge_server_template(&title, &rendered.html, &ctx.charset),
    )
}

fn directory_listing(ctx: &ServerContext, path: &str, fs_path: &Path) -> (StatusCode, String) {
    let entries = match fs::read_dir(fs_path) {
        Ok(entries) => entries,
        Err(err) => return read_error(ctx, path, err),
    };
    let mut listed: Vec<IndexEntry> = entries
        .flatten()
        .filter_map(|entry| {
            let entry_path = entry.path();
            let name = entry.file_name().to_string_lossy().into_owned();
            if entry_path.is_dir() {
                Some(IndexEntry { name, is_dir: true })
            } else if is_served_file(&entry_path) {
                Some(IndexEntry { name, is_dir: false })
            } else {
                None
            }
        })
        .collect();
    listed.sort_by(|a, b| a.name.cmp(&b.name));
    let label = if path.is_empty() { "/" } else { path };
    (StatusCode::OK, index_page(label, &listed, &ctx.charset))
}

fn read_error(ctx: &ServerContext, path: &str, err: std::io::Error) -> (StatusCode, String) {
    log::error!("could not read {}: {}", path, err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        merge_server_template(
            "Error",
            &format!(
                "<p>Could not read “{}”: {}</p>",
                escape_html(path),
                escape_html(&err.to_string())
            ),
            &ctx.charset,
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn test_context(root: &Path) -> ServerContext {
        ServerContext {
            host: "127.0.0.1".into(),
            port: 0,
            charset: "utf-8".into(),
            default_root: root.to_path_buf(),
            root_dirs: BTreeMap::new(),
            conversion: ConversionConfig::default(),
            templates: TemplateStore::new(root.join(".templates")),
        }
    }

    #[test]
    fn resolves_below_the_default_root() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(dir.path());
        assert_eq!(
            resolve_path(&ctx, "/notes/a.md"),
            dir.path().join("notes").join("a.md")
        );
        assert_eq!(resolve_path(&ctx, "/"), dir.path());
    }

    #[test]
    fn parent_segments_cannot_escape_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_context(dir.path());
        assert_eq!(
            resolve_path(&ctx, "/../../etc/passwd"),
            dir.path().join("etc").join("passwd")
        );
        assert_eq!(
            resolve_path(&ctx, "/a/../../b.md"),
            dir.path().join("b.md")
        );
    }

    #[test]
    fn labeled_roots_select_their_directory() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let mut ctx = test_context(dir.path());
        ctx.root_dirs
            .insert("wiki".into(), other.path().to_path_buf());
        assert_eq!(
            resolve_path(&ctx, "/wiki/page.md"),
            other.path().join("page.md")
        );
        assert_eq!(
            resolve_path(&ctx, "/other/page.md"),
            dir.path().join("other").join("page.md")
        );
    }

    #[test]
    fn listing_filters_to_served_files() {
        assert!(is_served_file(Path::new("a.md")));
        assert!(is_served_file(Path::new("a.TXT")));
        assert!(is_served_file(Path::new("a.htm")));
        assert!(!is_served_file(Path::new("a.png")));
        assert!(!is_served_file(Path::new("noext")));
    }
}
