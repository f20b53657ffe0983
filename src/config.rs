//! Selection of the table source
//!
//! Environment variables:
//! - `FREIGHT_QUOTE_REST_URL` / `FREIGHT_QUOTE_API_KEY`: rate store REST endpoint
//! - `FREIGHT_QUOTE_TABLE_DIR`: directory of CSV table exports
//!
//! With neither configured, the built-in tables are used. A configured source
//! that fails to load degrades to the built-in tables.

use crate::errors::SourceError;
use crate::rates::{FileSource, RestSource, StaticSource, TableSet, WithFallback};
use log::info;
use std::path::PathBuf;

pub const ENV_REST_URL: &str = "FREIGHT_QUOTE_REST_URL";
pub const ENV_API_KEY: &str = "FREIGHT_QUOTE_API_KEY";
pub const ENV_TABLE_DIR: &str = "FREIGHT_QUOTE_TABLE_DIR";

/// Where rate and deductible tables come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    /// Built-in tables only
    Static,
    /// CSV exports in a directory
    Files { dir: PathBuf },
    /// Rate store REST interface
    Rest { url: String, api_key: String },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Static
    }
}

impl SourceConfig {
    /// Read the configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. REST takes precedence over files; the REST
    /// store needs both a URL and a key.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let (Some(url), Some(api_key)) = (non_empty(ENV_REST_URL), non_empty(ENV_API_KEY)) {
            return SourceConfig::Rest { url, api_key };
        }
        if let Some(dir) = non_empty(ENV_TABLE_DIR) {
            return SourceConfig::Files { dir: PathBuf::from(dir) };
        }
        SourceConfig::Static
    }

    pub fn describe(&self) -> String {
        match self {
            SourceConfig::Static => "built-in tables".to_string(),
            SourceConfig::Files { dir } => format!("files in {}", dir.display()),
            SourceConfig::Rest { url, .. } => format!("rate store at {}", url),
        }
    }

    /// Resolve both tables. Only client construction can fail; load failures
    /// fall back to the built-in tables.
    pub fn load_tables(&self) -> Result<TableSet, SourceError> {
        info!("Loading quote tables from {}", self.describe());
        match self {
            SourceConfig::Static => TableSet::load(&StaticSource),
            SourceConfig::Files { dir } => TableSet::load(&WithFallback::new(FileSource::new(dir))),
            SourceConfig::Rest { url, api_key } => {
                let source = RestSource::new(url, api_key)?;
                TableSet::load(&WithFallback::new(source))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_static_by_default() {
        assert_eq!(SourceConfig::from_lookup(lookup(&[])), SourceConfig::Static);
    }

    #[test]
    fn test_rest_needs_url_and_key() {
        let config = SourceConfig::from_lookup(lookup(&[(ENV_REST_URL, "https://store.example.com")]));
        assert_eq!(config, SourceConfig::Static);

        let config = SourceConfig::from_lookup(lookup(&[
            (ENV_REST_URL, "https://store.example.com"),
            (ENV_API_KEY, "anon"),
            (ENV_TABLE_DIR, "data/tables"),
        ]));
        assert_eq!(
            config,
            SourceConfig::Rest {
                url: "https://store.example.com".into(),
                api_key: "anon".into(),
            }
        );
    }

    #[test]
    fn test_files_and_blank_values() {
        let config = SourceConfig::from_lookup(lookup(&[(ENV_TABLE_DIR, "data/tables"), (ENV_API_KEY, " ")]));
        assert_eq!(config, SourceConfig::Files { dir: PathBuf::from("data/tables") });
    }

    #[test]
    fn test_load_tables_falls_back() {
        let config = SourceConfig::Files {
            dir: PathBuf::from("/nonexistent/freight-quote-tables"),
        };
        assert_eq!(config.load_tables().unwrap(), TableSet::fallback());
        assert_eq!(SourceConfig::Static.load_tables().unwrap(), TableSet::fallback());
    }
}
