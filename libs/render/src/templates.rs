use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Placeholders every template body must contain.
pub const REQUIRED_PLACEHOLDERS: [&str; 4] = ["{lang}", "{head}", "{header}", "{body}"];

/// Builtin template names; they cannot be overwritten or removed.
pub const RESERVED_NAMES: [&str; 2] = ["minimal", "default"];

pub const MIN_NAME_LEN: usize = 1;
pub const MAX_NAME_LEN: usize = 28;

/// A named HTML skeleton filled at render time. Stored as one JSON `.tpl`
/// file per template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    pub name: String,
    pub description: String,
    pub content: String,
}

impl Template {
    /// Substitutes the four placeholders, each once.
    pub fn fill(&self, lang: &str, head: &str, header: &str, body: &str) -> String {
        self.content
            .replacen("{lang}", lang, 1)
            .replacen("{head}", head, 1)
            .replacen("{header}", header, 1)
            .replacen("{body}", body, 1)
    }
}

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error(
        "template name must be {MIN_NAME_LEN} to {MAX_NAME_LEN} characters \
         of lowercase letters, digits, hyphen or underscore"
    )]
    InvalidName,
    #[error("template name \"{0}\" is reserved")]
    ReservedName(String),
    #[error("template content is empty")]
    EmptyContent,
    #[error("template content is missing required placeholders: {0}")]
    MissingPlaceholders(String),
    #[error("could not read template: {0}")]
    Read(#[from] std::io::Error),
    #[error("could not parse template: {0}")]
    Parse(#[from] serde_json::Error),
}

/// File-backed template storage plus the two builtins.
#[derive(Debug, Clone)]
pub struct TemplateStore {
    dir: PathBuf,
}

impl TemplateStore {
    pub fn new(dir: PathBuf) -> Self {
        TemplateStore { dir }
    }

    /// The template that is just the document body.
    pub fn minimal() -> Template {
        Template {
            name: "minimal".into(),
            description: "Just the HTML from your Markdown".into(),
            content: "{body}".into(),
        }
    }

    /// The builtin full-page skeleton.
    pub fn default_template() -> Template {
        Template {
            name: "default".into(),
            description: "A minimal full-page template".into(),
            content: include_str!("../assets/default.html").into(),
        }
    }

    fn template_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.tpl", name))
    }

    pub fn get(&self, name: &str) -> Result<Template, TemplateError> {
        match name {
            "minimal" => Ok(Self::minimal()),
            "default" => Ok(Self::default_template()),
            _ => {
                let raw = fs::read_to_string(self.template_path(name))?;
                Ok(serde_json::from_str(&raw)?)
            }
        }
    }

    /// Falls back to the builtin default when `name` is unknown or its file
    /// is unreadable.
    pub fn get_or_default(&self, name: &str) -> Template {
        self.get(name).unwrap_or_else(|err| {
            log::warn!("template \"{}\" unavailable ({}), using default", name, err);
            Self::default_template()
        })
    }

    /// All known template names: builtins first, stored templates sorted.
    pub fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = RESERVED_NAMES.iter().map(|n| n.to_string()).collect();
        let mut stored = Vec::new();
        if let Ok(entries) = fs::read_dir(&self.dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().map(|e| e == "tpl").unwrap_or(false) {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        stored.push(stem.to_string());
                    }
                }
            }
        }
        stored.sort();
        names.extend(stored);
        names
    }

    /// Validates and persists a template. Rejection happens here, before
    /// anything is written.
    pub fn save(&self, template: &Template) -> Result<(), TemplateError> {
        validate(template)?;
        fs::create_dir_all(&self.dir)?;
        let raw = serde_json::to_string_pretty(template)?;
        fs::write(self.template_path(&template.name), raw)?;
        Ok(())
    }

    pub fn remove(&self, name: &str) -> Result<(), TemplateError> {
        if RESERVED_NAMES.contains(&name) {
            return Err(TemplateError::ReservedName(name.to_string()));
        }
        fs::remove_file(self.template_path(name))?;
        Ok(())
    }
}

fn valid_name(name: &str) -> bool {
    (MIN_NAME_LEN..=MAX_NAME_LEN).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

pub fn validate(template: &Template) -> Result<(), TemplateError> {
    if RESERVED_NAMES.contains(&template.name.as_str()) {
        return Err(TemplateError::ReservedName(template.name.clone()));
    }
    if !valid_name(&template.name) {
        return Err(TemplateError::InvalidName);
    }
    if template.content.trim().is_empty() {
        return Err(TemplateError::EmptyContent);
    }
    let missing: Vec<&str> = REQUIRED_PLACEHOLDERS
        .iter()
        .filter(|p| !template.content.contains(**p))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(TemplateError::MissingPlaceholders(missing.join(", ")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(name: &str, content: &str) -> Template {
        Template {
            name: name.into(),
            description: "test".into(),
            content: content.into(),
        }
    }

    const FULL: &str = "<html lang=\"{lang}\"><head>{head}</head>{header}{body}</html>";

    #[test]
    fn rejects_invalid_names() {
        assert!(matches!(
            validate(&sample("Has Caps", FULL)),
            Err(TemplateError::InvalidName)
        ));
        assert!(matches!(
            validate(&sample("", FULL)),
            Err(TemplateError::InvalidName)
        ));
        assert!(matches!(
            validate(&sample("a".repeat(29).as_str(), FULL)),
            Err(TemplateError::InvalidName)
        ));
        assert!(matches!(
            validate(&sample("default", FULL)),
            Err(TemplateError::ReservedName(_))
        ));
    }

    #[test]
    fn rejects_missing_placeholders() {
        let err = validate(&sample("partial", "<html>{lang}{body}</html>")).unwrap_err();
        match err {
            TemplateError::MissingPlaceholders(missing) => {
                assert_eq!(missing, "{head}, {header}");
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(matches!(
            validate(&sample("empty", "  ")),
            Err(TemplateError::EmptyContent)
        ));
        assert!(validate(&sample("ok-1", FULL)).is_ok());
    }

    #[test]
    fn save_get_list_remove_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::new(dir.path().to_path_buf());
        let template = sample("report", FULL);
        store.save(&template).unwrap();
        assert_eq!(store.get("report").unwrap(), template);
        assert_eq!(
            store.list(),
            vec![
                "minimal".to_string(),
                "default".to_string(),
                "report".to_string()
            ]
        );
        store.remove("report").unwrap();
        assert!(store.get("report").is_err());
    }

    #[test]
    fn builtins_cannot_be_saved_or_removed() {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::new(dir.path().to_path_buf());
        assert!(matches!(
            store.save(&sample("minimal", FULL)),
            Err(TemplateError::ReservedName(_))
        ));
        assert!(matches!(
            store.remove("default"),
            Err(TemplateError::ReservedName(_))
        ));
    }

    #[test]
    fn unknown_template_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let store = TemplateStore::new(dir.path().to_path_buf());
        assert_eq!(store.get_or_default("nope").name, "default");
    }

    #[test]
    fn fill_substitutes_each_placeholder_once() {
        let filled = TemplateStore::default_template().fill("en", "<title>t</title>", "<h1>h</h1>", "<p>b</p>");
        assert!(filled.contains("<html lang=\"en\">"));
        assert!(filled.contains("<title>t</title>"));
        assert!(filled.contains("<h1>h</h1>"));
        assert!(filled.contains("<p>b</p>"));
        assert!(!filled.contains("{body}"));
    }
}
