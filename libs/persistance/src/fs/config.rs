use std::collections::BTreeMap;
use std::fs;

use serde_derive::{Deserialize, Serialize};
use thiserror::Error;

use markdown::parsers::{ConversionConfig, Engine};

use super::utils::{get_config_location, parse_location};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine a configuration directory for this platform")]
    NoProjectDirs,
    #[error("could not read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("could not serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Conversion-side settings.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct General {
    /// "pulldown-cmark" or "comrak".
    pub engine: String,
    /// Template applied when a document names none.
    pub template: String,
    pub toc: bool,
    pub toc_back: String,
    pub autonumber_headings: bool,
    pub extratags: bool,
    pub extratags_back: bool,
    /// Default document root; also resolves include files.
    pub document_root: String,
    pub default_filename: String,
    pub lang: String,
    /// Engine feature toggles.
    pub extras: Vec<String>,
}

impl Default for General {
    fn default() -> Self {
        General {
            engine: "pulldown-cmark".into(),
            template: "default".into(),
            toc: false,
            toc_back: String::new(),
            autonumber_headings: false,
            extratags: false,
            extratags_back: true,
            document_root: "~/documents".into(),
            default_filename: String::new(),
            lang: "en".into(),
            extras: vec!["tables".into(), "strikethrough".into(), "footnotes".into()],
        }
    }
}

impl General {
    /// Builds the config object the conversion pipeline is handed. Unknown
    /// engine names fall back to pulldown-cmark.
    pub fn conversion_config(&self) -> ConversionConfig {
        let engine = Engine::from_name(&self.engine).unwrap_or_else(|| {
            log::warn!("unknown markdown engine \"{}\", using pulldown-cmark", self.engine);
            Engine::PulldownCmark
        });
        ConversionConfig {
            engine,
            template: self.template.clone(),
            toc: self.toc,
            toc_back: self.toc_back.clone(),
            autonumber_headings: self.autonumber_headings,
            extratags: self.extratags,
            extratags_back: self.extratags_back,
            lang: self.lang.clone(),
            default_path: parse_location(&self.document_root),
            default_filename: self.default_filename.clone(),
            extras: self.extras.clone(),
        }
    }
}

/// HTTP server settings. The server reads these at start; changes require
/// a stop and restart.
#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct Server {
    pub host: String,
    pub port: u16,
    /// Charset advertised in Content-Type headers.
    pub charset: String,
    /// Extra root folders by label: a request whose first path segment
    /// matches a label is served from the mapped directory.
    pub root_dirs: BTreeMap<String, String>,
}

impl Default for Server {
    fn default() -> Self {
        Server {
            host: "127.0.0.1".into(),
            port: 8590,
            charset: "utf-8".into(),
            root_dirs: BTreeMap::new(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub general: General,
    pub server: Server,
}

/// Reads the configuration file, writing a default one first if none
/// exists yet.
pub fn read_config() -> Result<Config, ConfigError> {
    let (config_dir, config_path) = get_config_location()?;
    if !config_path.exists() {
        fs::create_dir_all(&config_dir)?;
        fs::write(&config_path, toml::to_string(&Config::default())?)?;
        log::info!("wrote default configuration to {:?}", config_path);
    }
    let config = toml::from_str(&fs::read_to_string(&config_path)?)?;
    Ok(config)
}
