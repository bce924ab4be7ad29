//! Run configuration from the environment (and `.env`, loaded by the binary).
//!
//! | Variable               | Meaning                                   | Default          |
//! |------------------------|-------------------------------------------|------------------|
//! | `FORMATTER_LOG_DIR`    | directory for `<report>.log`              | per-user state dir |
//! | `FORMATTER_LOG_FILE`   | write the log file at all (`true`/`false`) | `true`          |
//! | `FORMATTER_COLUMN_CAP` | header column search limit                | `1000`           |
//! | `FORMATTER_ROW_CAP`    | body row search limit                     | `1000`           |
//! | `FORMATTER_DICTIONARY` | JSON file with dictionary overrides       | none             |

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::debug;

use crate::dictionary::{CategoryDictionary, DictionaryOverrides};
use crate::formatter::extract::ExtractSpec;
use crate::formatter::header::HeaderSpec;
use crate::formatter::section::SectionContext;

const APP_DIR: &str = "traffic_formatter";

#[derive(Debug, Clone, PartialEq)]
pub struct FormatterConfig {
    pub log_dir: PathBuf,
    pub log_to_file: bool,
    pub column_cap: u32,
    pub row_cap: u32,
    pub dictionary_path: Option<PathBuf>,
}

fn default_log_dir(lookup: &impl Fn(&str) -> Option<String>) -> PathBuf {
    let base = lookup("XDG_STATE_HOME")
        .map(PathBuf::from)
        .or_else(|| lookup("LOCALAPPDATA").map(PathBuf::from))
        .or_else(|| lookup("HOME").map(|home| Path::new(&home).join(".local").join("state")))
        .unwrap_or_else(std::env::temp_dir);
    base.join(APP_DIR).join("logs")
}

fn parse_flag(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("{key} must be true or false, got '{other}'"),
    }
}

fn parse_cap(key: &str, value: &str) -> Result<u32> {
    let cap: u32 = value
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a positive number, got '{value}'"))?;
    if cap == 0 {
        bail!("{key} must be greater than zero");
    }
    Ok(cap)
}

impl FormatterConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key/value source; `from_env` passes the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let log_dir = lookup("FORMATTER_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| default_log_dir(&lookup));
        let log_to_file = match lookup("FORMATTER_LOG_FILE") {
            Some(value) => parse_flag("FORMATTER_LOG_FILE", &value)?,
            None => true,
        };
        let column_cap = match lookup("FORMATTER_COLUMN_CAP") {
            Some(value) => parse_cap("FORMATTER_COLUMN_CAP", &value)?,
            None => HeaderSpec::default().column_cap,
        };
        let row_cap = match lookup("FORMATTER_ROW_CAP") {
            Some(value) => parse_cap("FORMATTER_ROW_CAP", &value)?,
            None => ExtractSpec::default().row_cap,
        };
        let dictionary_path = lookup("FORMATTER_DICTIONARY")
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            log_dir,
            log_to_file,
            column_cap,
            row_cap,
            dictionary_path,
        })
    }

    /// The built-in dictionary, with overrides from `dictionary_path` when set.
    pub fn dictionary(&self) -> Result<CategoryDictionary> {
        let Some(path) = &self.dictionary_path else {
            return Ok(CategoryDictionary::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read dictionary file {}", path.display()))?;
        let overrides: DictionaryOverrides = serde_json::from_str(&content)
            .with_context(|| format!("invalid dictionary file {}", path.display()))?;
        debug!(path = %path.display(), "dictionary overrides loaded");
        Ok(CategoryDictionary::default().with_overrides(overrides))
    }

    pub fn section_context(&self) -> Result<SectionContext> {
        Ok(SectionContext {
            dictionary: self.dictionary()?,
            header: HeaderSpec {
                column_cap: self.column_cap,
                ..HeaderSpec::default()
            },
            extract: ExtractSpec {
                row_cap: self.row_cap,
                ..ExtractSpec::default()
            },
            ..SectionContext::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Diagnostics;
    use std::collections::HashMap;
    use std::env;
    use std::fs;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = FormatterConfig::from_lookup(lookup(&[("HOME", "/home/ana")])).unwrap();
        assert_eq!(
            config.log_dir,
            PathBuf::from("/home/ana/.local/state/traffic_formatter/logs")
        );
        assert!(config.log_to_file);
        assert_eq!(config.column_cap, 1000);
        assert_eq!(config.row_cap, 1000);
        assert_eq!(config.dictionary_path, None);
    }

    #[test]
    fn test_overrides_from_env() {
        let config = FormatterConfig::from_lookup(lookup(&[
            ("XDG_STATE_HOME", "/state"),
            ("FORMATTER_LOG_FILE", "off"),
            ("FORMATTER_COLUMN_CAP", "250"),
        ]))
        .unwrap();
        assert_eq!(config.log_dir, PathBuf::from("/state/traffic_formatter/logs"));
        assert!(!config.log_to_file);
        assert_eq!(config.column_cap, 250);

        let ctx = config.section_context().unwrap();
        assert_eq!(ctx.header.column_cap, 250);
        assert_eq!(ctx.extract.row_cap, 1000);
    }

    #[test]
    fn test_invalid_values() {
        assert!(FormatterConfig::from_lookup(lookup(&[("FORMATTER_ROW_CAP", "many")])).is_err());
        assert!(FormatterConfig::from_lookup(lookup(&[("FORMATTER_ROW_CAP", "0")])).is_err());
        assert!(FormatterConfig::from_lookup(lookup(&[("FORMATTER_LOG_FILE", "maybe")])).is_err());
    }

    #[test]
    fn test_dictionary_file() {
        let path = env::temp_dir().join("traffic_formatter_test_dictionary.json");
        fs::write(&path, r#"{ "vehicle_classes": { "Trams": "T" } }"#).unwrap();

        let config = FormatterConfig::from_lookup(lookup(&[(
            "FORMATTER_DICTIONARY",
            path.to_str().unwrap(),
        )]))
        .unwrap();
        let dictionary = config.dictionary().unwrap();
        let mut diagnostics = Diagnostics::new();
        assert_eq!(dictionary.vehicle_code("trams", &mut diagnostics), "T");
        assert_eq!(dictionary.vehicle_code("Lights", &mut diagnostics), "LV");

        fs::write(&path, "not json").unwrap();
        assert!(config.dictionary().is_err());
        fs::remove_file(&path).ok();
    }
}
