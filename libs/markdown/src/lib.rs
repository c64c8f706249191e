pub mod parsers;
pub mod processors;

mod util;

pub use util::{escape_html, is_valid_filename};
