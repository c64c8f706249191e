pub mod extratags;
pub mod numbering;
pub mod toc;

pub use self::extratags::*;
pub use self::numbering::*;
pub use self::toc::*;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Matches one heading element: level, attribute tail, inner HTML.
    pub(crate) static ref HEADING_RE: Regex =
        Regex::new(r"(?s)<h([1-6])([^>]*)>(.*?)</h[1-6]\s*>").unwrap();
}

pub(crate) fn strip_tags(html: &str) -> String {
    lazy_static! {
        static ref TAG_RE: Regex = Regex::new(r"<[^>]*>").unwrap();
    }
    TAG_RE.replace_all(html, "").into_owned()
}
