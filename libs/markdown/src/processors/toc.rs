use std::collections::{BTreeSet, HashMap};

use lazy_static::lazy_static;
use regex::Regex;

use super::{strip_tags, TOC_MARK, HEADING_RE};

pub const BACK_TO_CONTENTS: &str =
    r##"<a class="toc-back" href="#doc-toc">Back to Table of Contents</a>"##;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub level: u8,
    pub text: String,
    pub id: String,
}

lazy_static! {
    static ref ID_RE: Regex = Regex::new(r#"\bid\s*=\s*"([^"]*)""#).unwrap();
    static ref OPEN_RE: Regex = Regex::new(r"<h([1-6])[\s>]").unwrap();
    static ref CLOSE_RE: Regex = Regex::new(r"</h([1-6])\s*>").unwrap();
}

/// Collects every heading in document order and makes sure each carries an
/// `id` attribute a contents entry can link to. Existing ids are kept;
/// generated slugs are deduplicated with a numeric suffix.
pub fn ensure_heading_ids(html: &str) -> (String, Vec<TocEntry>) {
    let mut entries = Vec::new();
    let mut seen: HashMap<String, u32> = HashMap::new();
    let out = HEADING_RE
        .replace_all(html, |caps: &regex::Captures| {
            let level: u8 = caps[1].parse().unwrap_or(1);
            let attrs = &caps[2];
            let inner = &caps[3];
            let text = strip_tags(inner).trim().to_string();
            if let Some(id) = ID_RE.captures(attrs).map(|c| c[1].to_string()) {
                entries.push(TocEntry { level, text, id });
                return caps[0].to_string();
            }
            let mut id = slugify(&text);
            let count = seen.entry(id.clone()).or_insert(0);
            if *count > 0 {
                id = format!("{}-{}", id, count);
            }
            *count += 1;
            entries.push(TocEntry {
                level,
                text,
                id: id.clone(),
            });
            format!("<h{} id=\"{}\"{}>{}</h{}>", level, id, attrs, inner, level)
        })
        .into_owned();
    (out, entries)
}

fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_dash = true;
    for c in text.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    let slug = slug.trim_end_matches('-').to_string();
    if slug.is_empty() {
        "section".into()
    } else {
        slug
    }
}

/// Renders the contents list, nested by heading level relative to the
/// shallowest entry. A deeper list opens inside the preceding entry's
/// `<li>`, which stays open until the subtree closes. Ordered lists are
/// used when autonumbering is on, so the browser numbering lines up with
/// the heading labels.
pub fn toc_list(entries: &[TocEntry], numbered: bool) -> String {
    let tag = if numbered { "ol" } else { "ul" };
    let base = entries.iter().map(|e| e.level).min().unwrap_or(1);
    let mut out = String::new();
    let mut depth = 0u8;
    for entry in entries {
        let want = entry.level - base + 1;
        while depth > want {
            out.push_str(&format!("</li></{}>", tag));
            depth -= 1;
        }
        if depth == want {
            out.push_str("</li>");
        }
        while depth < want {
            out.push_str(&format!("<{}>", tag));
            depth += 1;
            if depth < want {
                // empty holder entry for a skipped heading level
                out.push_str("<li>");
            }
        }
        out.push_str(&format!("<li><a href=\"#{}\">{}</a>", entry.id, entry.text));
    }
    while depth > 0 {
        out.push_str(&format!("</li></{}>", tag));
        depth -= 1;
    }
    out
}

/// Placement of "back to contents" links, parsed from specs like "b1,a2":
/// `b<n>` puts a link before every level-n heading (except the first such
/// heading), `a<n>` after every one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TocBackSpec {
    pub before: BTreeSet<u8>,
    pub after: BTreeSet<u8>,
}

impl TocBackSpec {
    pub fn parse(spec: &str) -> Self {
        let mut parsed = TocBackSpec::default();
        for part in spec.to_lowercase().split(',') {
            let part = part.trim();
            let mut chars = part.chars();
            match (chars.next(), chars.next(), chars.next()) {
                (Some(kind @ ('a' | 'b')), Some(level @ '1'..='6'), None) => {
                    let level = level as u8 - b'0';
                    if kind == 'b' {
                        parsed.before.insert(level);
                    } else {
                        parsed.after.insert(level);
                    }
                }
                _ => {
                    if !part.is_empty() {
                        log::debug!("ignoring contents-back spec part: {}", part);
                    }
                }
            }
        }
        parsed
    }

    pub fn is_empty(&self) -> bool {
        self.before.is_empty() && self.after.is_empty()
    }
}

fn add_back_links(html: &str, spec: &TocBackSpec) -> String {
    if spec.is_empty() {
        return html.to_string();
    }
    // (position, link) insertions, gathered then applied back to front
    let mut inserts: Vec<usize> = Vec::new();
    let mut first_before = true;
    for caps in OPEN_RE.captures_iter(html) {
        let level: u8 = caps[1].parse().unwrap_or(1);
        if spec.before.contains(&level) {
            if first_before {
                first_before = false;
            } else {
                inserts.push(caps.get(0).map(|m| m.start()).unwrap_or(0));
            }
        }
    }
    for caps in CLOSE_RE.captures_iter(html) {
        let level: u8 = caps[1].parse().unwrap_or(1);
        if spec.after.contains(&level) {
            inserts.push(caps.get(0).map(|m| m.end()).unwrap_or(0));
        }
    }
    inserts.sort_unstable();
    let mut out = html.to_string();
    for pos in inserts.into_iter().rev() {
        out.insert_str(pos, BACK_TO_CONTENTS);
    }
    out
}

/// Splices the contents block into the document. With a usable contents
/// list the reserved marker is honored (or the block is prepended under a
/// "Table of contents" heading) and back links are added per `spec`;
/// without one, the marker reverts to the literal `%toc%` token.
pub fn splice_contents(content: String, toc: Option<&str>, spec: &TocBackSpec) -> String {
    match toc {
        Some(toc) => {
            let mut content = add_back_links(&content, spec);
            if !content.contains(TOC_MARK) {
                content = format!(
                    "<h1 id=\"doc-toc-h1\">Table of contents</h1>{}{}",
                    TOC_MARK, content
                );
            }
            content.replace(
                TOC_MARK,
                &format!("<nav role=\"doc-toc\" id=\"doc-toc\">{}</nav>", toc),
            )
        }
        None => content.replace(TOC_MARK, "%toc%"),
    }
}
