use comrak::ComrakOptions;
use pulldown_cmark::{html, Options, Parser};

/// The two interchangeable Markdown engines. Selected by configuration;
/// both honor the same set of feature toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    PulldownCmark,
    Comrak,
}

impl Engine {
    pub fn from_name(name: &str) -> Option<Engine> {
        match name.trim().to_lowercase().as_str() {
            "pulldown-cmark" | "pulldown" => Some(Engine::PulldownCmark),
            "comrak" => Some(Engine::Comrak),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Engine::PulldownCmark => "pulldown-cmark",
            Engine::Comrak => "comrak",
        }
    }
}

/// Converts a Markdown body to HTML with the selected engine. Raw HTML in
/// the source passes through untouched with either engine.
pub fn to_html(md: &str, engine: Engine, extras: &[String]) -> String {
    match engine {
        Engine::PulldownCmark => pulldown_html(md, extras),
        Engine::Comrak => comrak_html(md, extras),
    }
}

fn has_extra(extras: &[String], name: &str) -> bool {
    extras.iter().any(|e| e == name)
}

fn pulldown_html(md: &str, extras: &[String]) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    if has_extra(extras, "tables") {
        options.insert(Options::ENABLE_TABLES);
    }
    if has_extra(extras, "footnotes") {
        options.insert(Options::ENABLE_FOOTNOTES);
    }
    if has_extra(extras, "strikethrough") {
        options.insert(Options::ENABLE_STRIKETHROUGH);
    }
    if has_extra(extras, "tasklists") {
        options.insert(Options::ENABLE_TASKLISTS);
    }
    if has_extra(extras, "smart-punctuation") {
        options.insert(Options::ENABLE_SMART_PUNCTUATION);
    }
    let parser = Parser::new_ext(md, options);
    let mut out = String::with_capacity(md.len() * 2);
    html::push_html(&mut out, parser);
    out
}

fn comrak_html(md: &str, extras: &[String]) -> String {
    let mut options = ComrakOptions::default();
    options.extension.table = has_extra(extras, "tables");
    options.extension.footnotes = has_extra(extras, "footnotes");
    options.extension.strikethrough = has_extra(extras, "strikethrough");
    options.extension.tasklist = has_extra(extras, "tasklists");
    options.parse.smart = has_extra(extras, "smart-punctuation");
    // documents legitimately embed raw HTML (includes, extra tags)
    options.render.unsafe_ = true;
    comrak::markdown_to_html(md, &options)
}
