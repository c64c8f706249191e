pub mod html;
pub mod metadata;

pub use self::html::*;
pub use self::metadata::*;

use std::path::PathBuf;

/// The slice of the application configuration the conversion pipeline
/// consumes. Constructed once by the caller and passed by value; there is
/// no global configuration cell.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionConfig {
    pub engine: Engine,
    /// Name of the template applied when a document names none.
    pub template: String,
    pub toc: bool,
    /// "Back to contents" placement spec, e.g. "b1,a2".
    pub toc_back: String,
    pub autonumber_headings: bool,
    pub extratags: bool,
    /// When set, extra-tag substitutions are recorded so they can be
    /// reverted later.
    pub extratags_back: bool,
    /// Document language used when a document declares none.
    pub lang: String,
    /// Base directory for include files and relative lookups.
    pub default_path: PathBuf,
    /// File name applied when a document declares none; when empty a
    /// timestamped name is generated instead.
    pub default_filename: String,
    /// Engine feature toggles ("tables", "footnotes", ...).
    pub extras: Vec<String>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        ConversionConfig {
            engine: Engine::PulldownCmark,
            template: "default".into(),
            toc: false,
            toc_back: String::new(),
            autonumber_headings: false,
            extratags: false,
            extratags_back: true,
            lang: "en".into(),
            default_path: PathBuf::from("."),
            default_filename: String::new(),
            extras: vec!["tables".into(), "strikethrough".into()],
        }
    }
}
