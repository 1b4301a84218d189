use std::fs;
use std::time::Duration;

use camino::Utf8PathBuf;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

pub const CONFIG_FILE_NAME: &str = "dexcat.json";
pub const DEFAULT_API_BASE: &str = "https://pokeapi.co/api/v2";
pub const DEFAULT_PAGE_SIZE: usize = 48;
pub const DEFAULT_MATCH_CAP: usize = 50;
pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 8;
pub const DEFAULT_COMPACT_WIDTH: u16 = 80;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default)]
    pub page_size: Option<usize>,
    #[serde(default)]
    pub match_cap: Option<usize>,
    #[serde(default)]
    pub preferred_language: Option<String>,
    #[serde(default)]
    pub fallback_language: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_concurrent_fetches: Option<usize>,
    #[serde(default)]
    pub compact_width: Option<u16>,
}

/// Flavour-text language preference, tried in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePreference {
    pub preferred: String,
    pub fallback: String,
}

impl Default for LanguagePreference {
    fn default() -> Self {
        Self {
            preferred: DEFAULT_LANGUAGE.to_string(),
            fallback: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub api_base: String,
    pub page_size: usize,
    pub match_cap: usize,
    pub languages: LanguagePreference,
    pub request_timeout: Duration,
    pub max_concurrent_fetches: usize,
    pub compact_width: u16,
    pub source: Option<Utf8PathBuf>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            schema_version: 1,
            api_base: DEFAULT_API_BASE.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            match_cap: DEFAULT_MATCH_CAP,
            languages: LanguagePreference::default(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            compact_width: DEFAULT_COMPACT_WIDTH,
            source: None,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads an explicit config file, or the first default location that
    /// exists. Falls back to built-in defaults when no file is found.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, CatalogError> {
        let config_path = match path {
            Some(path) => Utf8PathBuf::from(path),
            None => match Self::default_path() {
                Some(path) => path,
                None => return Ok(ResolvedConfig::default()),
            },
        };

        let content = fs::read_to_string(config_path.as_std_path())
            .map_err(|_| CatalogError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| CatalogError::ConfigParse(err.to_string()))?;

        let mut resolved = Self::resolve_config(config)?;
        resolved.source = Some(config_path);
        Ok(resolved)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, CatalogError> {
        let defaults = ResolvedConfig::default();

        let api_base = config
            .api_base
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base);
        if api_base.is_empty() {
            return Err(CatalogError::InvalidConfig(
                "api_base must not be empty".to_string(),
            ));
        }

        let page_size = positive("page_size", config.page_size, defaults.page_size)?;
        let match_cap = positive("match_cap", config.match_cap, defaults.match_cap)?;
        let max_concurrent_fetches = positive(
            "max_concurrent_fetches",
            config.max_concurrent_fetches,
            defaults.max_concurrent_fetches,
        )?;
        let timeout_secs = config.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(CatalogError::InvalidConfig(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        let preferred = language(config.preferred_language)
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        let fallback = language(config.fallback_language)
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

        Ok(ResolvedConfig {
            schema_version: config.schema_version.unwrap_or(1),
            api_base,
            page_size,
            match_cap,
            languages: LanguagePreference {
                preferred,
                fallback,
            },
            request_timeout: Duration::from_secs(timeout_secs),
            max_concurrent_fetches,
            compact_width: config.compact_width.unwrap_or(defaults.compact_width),
            source: None,
        })
    }

    fn default_path() -> Option<Utf8PathBuf> {
        let local = Utf8PathBuf::from(CONFIG_FILE_NAME);
        if local.as_std_path().exists() {
            return Some(local);
        }
        ProjectDirs::from("", "", "dexcat")
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.config_dir().join(CONFIG_FILE_NAME)).ok()
            })
            .filter(|path| path.as_std_path().exists())
    }
}

fn positive(field: &str, value: Option<usize>, default: usize) -> Result<usize, CatalogError> {
    match value {
        Some(0) => Err(CatalogError::InvalidConfig(format!(
            "{field} must be greater than zero"
        ))),
        Some(value) => Ok(value),
        None => Ok(default),
    }
}

fn language(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_lowercase())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let resolved = ConfigLoader::resolve_config(Config::default()).unwrap();
        assert_eq!(resolved.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(resolved.match_cap, DEFAULT_MATCH_CAP);
        assert_eq!(resolved.api_base, DEFAULT_API_BASE);
        assert_eq!(resolved.languages, LanguagePreference::default());
    }

    #[test]
    fn zero_page_size_is_rejected() {
        let config = Config {
            page_size: Some(0),
            ..Config::default()
        };
        assert_matches!(
            ConfigLoader::resolve_config(config),
            Err(CatalogError::InvalidConfig(_))
        );
    }

    #[test]
    fn api_base_trailing_slash_is_trimmed() {
        let config = Config {
            api_base: Some("http://localhost:8080/api/v2/".to_string()),
            ..Config::default()
        };
        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.api_base, "http://localhost:8080/api/v2");
    }
}
