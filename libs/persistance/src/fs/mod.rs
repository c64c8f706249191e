pub mod config;
pub mod utils;

pub use self::config::*;
pub use self::utils::*;
