//! Runtime configuration
//!
//! Settings come from the environment and can be overridden from the command
//! line. Empty environment values count as unset.

use std::path::PathBuf;

use thiserror::Error;

use crate::cache::DEFAULT_TTL_HOURS;
use crate::data::gemini::{DEFAULT_GEMINI_MODEL, GEMINI_BASE_URL};
use crate::data::pokeapi::POKEAPI_BASE_URL;

/// Primary environment variable holding the Gemini key
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
/// Fallback environment variable holding the Gemini key
pub const API_KEY_FALLBACK_VAR: &str = "API_KEY";
pub const MODEL_VAR: &str = "NUZLOCKE_GEMINI_MODEL";
pub const GEMINI_URL_VAR: &str = "NUZLOCKE_GEMINI_URL";
pub const POKEAPI_URL_VAR: &str = "NUZLOCKE_POKEAPI_URL";
pub const DATA_DIR_VAR: &str = "NUZLOCKE_DATA_DIR";

/// Errors in the assembled configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cache TTL must be at least one hour")]
    InvalidCacheTtl,

    #[error("{name} must be an http(s) URL, got \"{value}\"")]
    InvalidUrl { name: &'static str, value: String },
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Gemini API key; `None` disables generative features
    pub api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub pokeapi_base_url: String,
    /// Storage directory; `None` uses the platform data directory
    pub data_dir: Option<PathBuf>,
    pub cache_ttl_hours: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_base_url: GEMINI_BASE_URL.to_string(),
            pokeapi_base_url: POKEAPI_BASE_URL.to_string(),
            data_dir: None,
            cache_ttl_hours: DEFAULT_TTL_HOURS,
        }
    }
}

impl Config {
    /// Reads configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`, treating empty values as unset
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let defaults = Self::default();
        Self {
            api_key: get(API_KEY_VAR).or_else(|| get(API_KEY_FALLBACK_VAR)),
            gemini_model: get(MODEL_VAR).unwrap_or(defaults.gemini_model),
            gemini_base_url: get(GEMINI_URL_VAR).unwrap_or(defaults.gemini_base_url),
            pokeapi_base_url: get(POKEAPI_URL_VAR).unwrap_or(defaults.pokeapi_base_url),
            data_dir: get(DATA_DIR_VAR).map(PathBuf::from),
            cache_ttl_hours: defaults.cache_ttl_hours,
        }
    }

    /// Applies command-line overrides
    pub fn with_overrides(mut self, data_dir: Option<PathBuf>, cache_ttl_hours: Option<i64>) -> Self {
        if let Some(dir) = data_dir {
            self.data_dir = Some(dir);
        }
        if let Some(hours) = cache_ttl_hours {
            self.cache_ttl_hours = hours;
        }
        self
    }

    /// Checks values that cannot be validated while parsing
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_ttl_hours < 1 {
            return Err(ConfigError::InvalidCacheTtl);
        }
        for (name, value) in [
            (GEMINI_URL_VAR, &self.gemini_base_url),
            (POKEAPI_URL_VAR, &self.pokeapi_base_url),
        ] {
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl {
                    name,
                    value: value.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}
