use std::path::{PathBuf, MAIN_SEPARATOR};

use directories::{ProjectDirs, UserDirs};

use super::config::ConfigError;

fn project_dirs() -> Result<ProjectDirs, ConfigError> {
    ProjectDirs::from("", "", "mdserve").ok_or(ConfigError::NoProjectDirs)
}

pub fn get_config_location() -> Result<(PathBuf, PathBuf), ConfigError> {
    let project_dir = project_dirs()?;
    let config_dir = project_dir.config_dir().to_owned();
    let config_path = config_dir.join("config.toml");
    Ok((config_dir, config_path))
}

/// Directory the template store keeps its `.tpl` files in.
pub fn get_templates_location() -> Result<PathBuf, ConfigError> {
    let (config_dir, _) = get_config_location()?;
    Ok(config_dir.join("templates"))
}

/// Expands a leading `~` to the user's home directory.
pub fn parse_location(location: &str) -> PathBuf {
    let mut loc: String;
    if location.contains('~') {
        if let Some(dirs) = UserDirs::new() {
            let home_dir: String = dirs.home_dir().to_string_lossy().into();
            loc = location.replace('~', &home_dir);
        } else {
            loc = location.replace('~', &std::env::var("HOME").unwrap_or_default());
        }
    } else {
        loc = location.to_owned();
    }
    if loc.is_empty() {
        loc.push('.');
    }
    if !loc.ends_with(MAIN_SEPARATOR) {
        loc.push(MAIN_SEPARATOR)
    }
    PathBuf::from(loc)
}
