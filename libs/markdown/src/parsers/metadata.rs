use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::Local;
use serde_yaml::Value;

use crate::util::{escape_html, is_valid_filename};

use super::ConversionConfig;

/// Normalized document metadata. Every field is populated: values the
/// document does not declare (or declares with the wrong type) fall back to
/// the configured defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentMeta {
    pub title: String,
    pub subtitle: String,
    pub authors: Vec<String>,
    pub lang: String,
    pub template: String,
    pub toc: bool,
    pub toc_back: String,
    pub autonumber_headings: bool,
    pub extratags: bool,
    pub extratags_back: bool,
    pub keywords: Option<String>,
    pub date: Option<String>,
    pub css: Vec<String>,
    pub path: PathBuf,
    pub filename: String,
    /// Synthesized `<head>` fragment for the `{head}` template placeholder.
    pub html_head: String,
    /// Synthesized document header for the `{header}` placeholder.
    pub html_header: String,
}

impl DocumentMeta {
    pub fn from_defaults(config: &ConversionConfig) -> Self {
        DocumentMeta {
            title: String::new(),
            subtitle: String::new(),
            authors: Vec::new(),
            lang: config.lang.clone(),
            template: config.template.clone(),
            toc: config.toc,
            toc_back: config.toc_back.clone(),
            autonumber_headings: config.autonumber_headings,
            extratags: config.extratags,
            extratags_back: config.extratags_back,
            keywords: None,
            date: None,
            css: Vec::new(),
            path: config.default_path.clone(),
            filename: default_filename(config),
            html_head: String::new(),
            html_header: String::new(),
        }
    }
}

/// Splits a leading metadata block off `text`. The block opens with a `---`
/// line and ends at the first `---` or blank line. Returns the YAML slice,
/// the raw block (fences included) and the remainder. An unterminated block
/// is treated as no block at all.
fn split_metadata_block(text: &str) -> Option<(&str, &str, &str)> {
    let mut lines = text.split_inclusive('\n');
    let first = lines.next()?;
    if first.trim_end_matches(['\r', '\n']) != "---" || !first.ends_with('\n') {
        return None;
    }
    let yaml_start = first.len();
    let mut pos = yaml_start;
    for line in lines {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed == "---" || trimmed.is_empty() {
            let block_end = pos + line.len();
            return Some((&text[yaml_start..pos], &text[..block_end], &text[block_end..]));
        }
        pos += line.len();
    }
    None
}

/// Extracts and normalizes the metadata block of a document. Never fails:
/// a malformed block degrades to an inline error section prepended to the
/// body, and the metadata falls back to the configured defaults.
pub fn extract_metadata(text: &str, config: &ConversionConfig) -> (DocumentMeta, String) {
    let (fields, body) = match split_metadata_block(text) {
        Some((yaml, raw_block, rest)) => match serde_yaml::from_str::<Value>(yaml) {
            Ok(Value::Mapping(mapping)) => (lowercase_keys(mapping), rest.trim_start().to_string()),
            Ok(_) => (BTreeMap::new(), rest.trim_start().to_string()),
            Err(err) => {
                log::warn!("malformed metadata block: {}", err);
                let body = format!(
                    "! {}\n\n```\n{}\n```\n\n{}",
                    err,
                    raw_block.trim_end(),
                    rest.trim_start()
                );
                (BTreeMap::new(), body)
            }
        },
        None => (BTreeMap::new(), text.to_string()),
    };
    let mut meta = normalize(&fields, config);
    synthesize_fragments(&mut meta);

    let before = include_files(&fields, "include-before", config);
    let after = include_files(&fields, "include-after", config);
    let mut full = String::new();
    if !before.is_empty() {
        full.push_str(&before);
        full.push('\n');
    }
    full.push_str(&body);
    if !after.is_empty() {
        full.push('\n');
        full.push_str(&after);
    }
    (meta, full)
}

fn lowercase_keys(mapping: serde_yaml::Mapping) -> BTreeMap<String, Value> {
    mapping
        .into_iter()
        .filter_map(|(k, v)| k.as_str().map(|k| (k.to_lowercase(), v)))
        .collect()
}

fn get_string(fields: &BTreeMap<String, Value>, key: &str) -> Option<String> {
    match fields.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        _ => None,
    }
}

fn get_bool(fields: &BTreeMap<String, Value>, key: &str, default: bool) -> bool {
    match fields.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_i64().map(|v| v != 0).unwrap_or(default),
        _ => default,
    }
}

/// A scalar string is treated as a one-element list.
fn get_string_list(fields: &BTreeMap<String, Value>, key: &str) -> Vec<String> {
    match fields.get(key) {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Sequence(seq)) => seq
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn normalize(fields: &BTreeMap<String, Value>, config: &ConversionConfig) -> DocumentMeta {
    let mut meta = DocumentMeta::from_defaults(config);
    if let Some(title) = get_string(fields, "title") {
        meta.title = title;
    }
    if let Some(subtitle) = get_string(fields, "subtitle") {
        meta.subtitle = subtitle;
    }
    let mut authors = get_string_list(fields, "author");
    if authors.is_empty() {
        authors = get_string_list(fields, "authors");
    }
    meta.authors = authors;
    if let Some(lang) = get_string(fields, "lang").or_else(|| get_string(fields, "language")) {
        meta.lang = lang;
    }
    if let Some(template) = get_string(fields, "template") {
        meta.template = template;
    }
    meta.toc = get_bool(fields, "toc", config.toc);
    if let Some(toc_back) = get_string(fields, "toc-back") {
        meta.toc_back = toc_back;
    }
    meta.autonumber_headings = get_bool(fields, "autonumber-headings", config.autonumber_headings);
    meta.extratags = get_bool(fields, "extratags", config.extratags);
    meta.extratags_back = get_bool(fields, "extratags-back", config.extratags_back);
    meta.keywords = get_string(fields, "keywords");
    meta.date = get_string(fields, "date");
    meta.css = get_string_list(fields, "css");
    if let Some(path) = get_string(fields, "path") {
        let path = PathBuf::from(path);
        if path.is_dir() {
            meta.path = path;
        }
    }
    if let Some(filename) = get_string(fields, "filename") {
        if is_valid_filename(&filename) {
            meta.filename = filename;
        }
    }
    meta
}

fn default_filename(config: &ConversionConfig) -> String {
    if is_valid_filename(&config.default_filename) {
        config.default_filename.clone()
    } else {
        format!(
            "MDF_{}",
            Local::now().naive_local().format("%y-%m-%d_-_%H-%M-%S")
        )
    }
}

/// Builds the `{head}` and `{header}` fragments from the normalized fields.
fn synthesize_fragments(meta: &mut DocumentMeta) {
    let mut head = vec![
        r#"<meta name="generator" content="mdserve" />"#.to_string(),
        r#"<meta name="viewport" content="width=device-width, initial-scale=1.0, user-scalable=yes" />"#
            .to_string(),
    ];
    let mut header = Vec::new();
    head.push(format!("<title>{}</title>", escape_html(&meta.title)));
    if !meta.title.is_empty() {
        header.push(format!(
            r#"<h1 class="title">{}</h1>"#,
            escape_html(&meta.title)
        ));
    }
    if !meta.subtitle.is_empty() {
        header.push(format!(
            r#"<p class="subtitle">{}</p>"#,
            escape_html(&meta.subtitle)
        ));
    }
    if let Some(keywords) = &meta.keywords {
        head.push(format!(
            r#"<meta name="keywords" content="{}" />"#,
            escape_html(keywords)
        ));
    }
    for author in &meta.authors {
        let author = escape_html(author);
        head.push(format!(r#"<meta name="author" content="{}" />"#, author));
        header.push(format!(r#"<p class="author">{}</p>"#, author));
    }
    for css in &meta.css {
        head.push(format!(
            r#"<link rel="stylesheet" href="{}" />"#,
            escape_html(css)
        ));
    }
    if let Some(date) = &meta.date {
        let date = escape_html(date);
        head.push(format!(r#"<meta name="dcterms.date" content="{}" />"#, date));
        header.push(format!(r#"<p class="date">{}</p>"#, date));
    }
    meta.html_head = head.join("\n");
    meta.html_header = header.join("\n");
}

fn include_files(
    fields: &BTreeMap<String, Value>,
    key: &str,
    config: &ConversionConfig,
) -> String {
    get_string_list(fields, key)
        .iter()
        .map(|fp| include_file(fp, config))
        .collect::<Vec<String>>()
        .join("\n")
}

/// Reads an include file, relative paths resolving against the configured
/// default path. A missing or unreadable file degrades to an inline error
/// element rather than failing the conversion.
fn include_file(fp: &str, config: &ConversionConfig) -> String {
    let direct = PathBuf::from(fp);
    let path = if direct.exists() {
        direct
    } else {
        config.default_path.join(fp)
    };
    match std::fs::read_to_string(&path) {
        Ok(text) => match split_metadata_block(&text) {
            Some((_, _, rest)) => rest.trim_start().to_string(),
            None => text,
        },
        Err(err) => {
            log::warn!("could not include {}: {}", fp, err);
            format!(
                r#"<div class="conversion-error" role="complementary">Unable to include “{}”: {}</div>"#,
                escape_html(fp),
                escape_html(&err.to_string())
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    fn config() -> ConversionConfig {
        ConversionConfig {
            lang: "fr".into(),
            template: "default".into(),
            toc: true,
            ..ConversionConfig::default()
        }
    }

    #[test]
    fn document_without_block_is_unchanged() {
        let text = "# A plain document\n\nwith two paragraphs.\n";
        let (meta, body) = extract_metadata(text, &config());
        assert_eq!(body, text);
        assert_eq!(meta.title, "");
        assert_eq!(meta.lang, "fr");
        assert!(meta.toc);
        assert_eq!(meta.template, "default");
    }

    #[test]
    fn well_formed_block_is_stripped_and_normalized() {
        let text = "---\nTitle: Field notes\nlanguage: de\nauthors:\n  - Ada\n  - Grace\ntoc: false\n---\n\n# Body\n";
        let (meta, body) = extract_metadata(text, &config());
        assert_eq!(body, "# Body\n");
        assert_eq!(meta.title, "Field notes");
        assert_eq!(meta.lang, "de");
        assert_eq!(meta.authors, vec!["Ada".to_string(), "Grace".to_string()]);
        assert!(!meta.toc);
        assert!(meta.html_head.contains("<title>Field notes</title>"));
        assert!(meta
            .html_header
            .contains(r#"<h1 class="title">Field notes</h1>"#));
        assert!(meta.html_head.contains(r#"<meta name="author" content="Ada" />"#));
    }

    #[test]
    fn blank_line_closes_the_block() {
        let text = "---\ntitle: Short\n\nbody text\n";
        let (meta, body) = extract_metadata(text, &config());
        assert_eq!(meta.title, "Short");
        assert_eq!(body, "body text\n");
    }

    #[test]
    fn wrong_typed_fields_fall_back_to_defaults() {
        let text = "---\ntitle: 42\ntoc: banana\n---\n\nbody\n";
        let (meta, _) = extract_metadata(text, &config());
        // numeric title is not a string, boolean default comes from config
        assert_eq!(meta.title, "");
        assert!(meta.toc);
    }

    #[test]
    fn malformed_block_degrades_to_inline_error() {
        let text = "---\ntitle: [unterminated\n---\n\nbody\n";
        let (meta, body) = extract_metadata(text, &config());
        assert_eq!(meta.title, "");
        assert!(body.starts_with("! "));
        assert!(body.contains("```"));
        assert!(body.contains("title: [unterminated"));
        assert!(body.ends_with("body\n"));
    }

    #[test]
    fn unterminated_block_is_not_a_block() {
        let text = "---\ntitle: Dangling";
        let (meta, body) = extract_metadata(text, &config());
        assert_eq!(meta.title, "");
        assert_eq!(body, text);
    }

    #[test]
    fn missing_include_becomes_inline_error() {
        let text = "---\ninclude-before: no-such-file.md\n---\n\nbody\n";
        let (_, body) = extract_metadata(text, &config());
        assert!(body.contains(r#"class="conversion-error""#));
        assert!(body.contains("no-such-file.md"));
        assert!(body.ends_with("body\n"));
    }

    #[test]
    fn include_splices_file_content_without_its_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let fp = dir.path().join("intro.md");
        let mut f = std::fs::File::create(&fp).unwrap();
        write!(f, "---\ntitle: ignored\n---\n\nintro text\n").unwrap();
        let mut cfg = config();
        cfg.default_path = dir.path().to_path_buf();
        let text = "---\ninclude-before: intro.md\n---\n\nbody\n";
        let (_, body) = extract_metadata(text, &cfg);
        assert!(body.starts_with("intro text"));
        assert!(body.ends_with("body\n"));
    }
}
