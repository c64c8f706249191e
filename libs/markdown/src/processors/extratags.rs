use chrono::NaiveDateTime;
use lazy_static::lazy_static;
use regex::Regex;

/// Reserved location the table-of-contents block is spliced into. The
/// `%toc%` extra tag is rewritten to this marker before splicing.
pub const TOC_MARK: &str = "<!-- doc-toc -->";

lazy_static! {
    static ref TOKEN_RE: Regex = Regex::new(
        "%(day|Day|dday|month|Month|dmonth|year|Year|date|time|now|version)%"
    )
    .unwrap();
    // pre first, so code blocks nested in pre are covered by the outer match
    static ref PROTECTED_RE: Regex =
        Regex::new(r"(?s)<pre\b.*?</pre>|<code\b.*?</code>").unwrap();
}

/// One forward substitution: the byte span it occupies in the output and
/// the token it replaced. The reverse pass consults this table instead of
/// scanning the text for marker elements.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagSubstitution {
    pub start: usize,
    pub len: usize,
    pub token: String,
}

/// Rewrites `%toc%` to the splice marker, leaving `<code>` and `<pre>`
/// content untouched. Runs before contents splicing; the marker is not a
/// reversible substitution.
pub fn replace_toc_token(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut cursor = 0;
    for protected in PROTECTED_RE.find_iter(html) {
        out.push_str(&html[cursor..protected.start()].replace("%toc%", TOC_MARK));
        out.push_str(protected.as_str());
        cursor = protected.end();
    }
    out.push_str(&html[cursor..].replace("%toc%", TOC_MARK));
    out
}

/// Replaces the date/time/version tokens with computed values, leaving
/// `<code>` and `<pre>` content untouched. Returns the substituted text and
/// the side table of reversible substitutions. The recorded spans index the
/// returned text, so this must be the last pass over the document.
pub fn process_extra_tags(
    html: &str,
    now: &NaiveDateTime,
    version: &str,
) -> (String, Vec<TagSubstitution>) {
    let mut out = String::with_capacity(html.len());
    let mut subs = Vec::new();
    let mut cursor = 0;
    for protected in PROTECTED_RE.find_iter(html) {
        substitute_segment(&html[cursor..protected.start()], &mut out, &mut subs, now, version);
        out.push_str(protected.as_str());
        cursor = protected.end();
    }
    substitute_segment(&html[cursor..], &mut out, &mut subs, now, version);
    (out, subs)
}

fn substitute_segment(
    segment: &str,
    out: &mut String,
    subs: &mut Vec<TagSubstitution>,
    now: &NaiveDateTime,
    version: &str,
) {
    let mut cursor = 0;
    for m in TOKEN_RE.find_iter(segment) {
        out.push_str(&segment[cursor..m.start()]);
        let token = m.as_str();
        let name = &token[1..token.len() - 1];
        let value = token_value(name, now, version);
        subs.push(TagSubstitution {
            start: out.len(),
            len: value.len(),
            token: token.to_string(),
        });
        out.push_str(&value);
        cursor = m.end();
    }
    out.push_str(&segment[cursor..]);
}

fn token_value(name: &str, now: &NaiveDateTime, version: &str) -> String {
    match name {
        "day" => now.format("%A").to_string().to_lowercase(),
        "Day" => now.format("%A").to_string(),
        "dday" => now.format("%d").to_string(),
        "month" => now.format("%B").to_string().to_lowercase(),
        "Month" => now.format("%B").to_string(),
        "dmonth" => now.format("%m").to_string(),
        "year" => now.format("%y").to_string(),
        "Year" => now.format("%Y").to_string(),
        "date" => now.format("%x").to_string(),
        "time" => now.format("%X").to_string(),
        "now" => now.format("%c").to_string(),
        "version" => version.to_string(),
        _ => format!("%{}%", name),
    }
}

/// Restores the original tokens recorded by `process_extra_tags`. Entries
/// whose span no longer fits the text are skipped.
pub fn revert_extra_tags(html: &str, subs: &[TagSubstitution]) -> String {
    let mut out = html.to_string();
    for sub in subs.iter().rev() {
        let end = sub.start + sub.len;
        if end <= out.len() && out.is_char_boundary(sub.start) && out.is_char_boundary(end) {
            out.replace_range(sub.start..end, &sub.token);
        } else {
            log::warn!("stale extra-tag span {}..{}", sub.start, end);
        }
    }
    out
}
