// ABOUTME: Runtime configuration read from HYDRO_* environment variables,
// ABOUTME: with defaults for a locally served ChatGLM3 endpoint.

use crate::conversation::DEFAULT_MAX_RETRIES;
use crate::error::ConfigError;
use crate::llm::{DEFAULT_BASE_URL, DEFAULT_MODEL};

/// Default base URL of the hydrology data API.
pub const DEFAULT_HYDRO_BASE_URL: &str = "https://hydro.market.alicloudapi.com";

/// Settings for the completion endpoint, the hydrology API and the
/// conversation loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub llm_base_url: String,
    pub llm_api_key: String,
    pub llm_model: String,
    pub hydro_base_url: String,
    pub hydro_appcode: String,
    pub max_retries: usize,
    pub stream: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_base_url: DEFAULT_BASE_URL.to_string(),
            llm_api_key: "EMPTY".to_string(),
            llm_model: DEFAULT_MODEL.to_string(),
            hydro_base_url: DEFAULT_HYDRO_BASE_URL.to_string(),
            hydro_appcode: String::new(),
            max_retries: DEFAULT_MAX_RETRIES,
            stream: false,
        }
    }
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`; unset or blank keys keep their
    /// defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(v) = get("HYDRO_LLM_BASE_URL") {
            config.llm_base_url = v;
        }
        if let Some(v) = get("HYDRO_LLM_API_KEY") {
            config.llm_api_key = v;
        }
        if let Some(v) = get("HYDRO_LLM_MODEL") {
            config.llm_model = v;
        }
        if let Some(v) = get("HYDRO_API_BASE_URL") {
            config.hydro_base_url = v;
        }
        if let Some(v) = get("HYDRO_APPCODE") {
            config.hydro_appcode = v;
        }
        if let Some(v) = get("HYDRO_MAX_RETRIES") {
            config.max_retries = v.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "HYDRO_MAX_RETRIES",
                value: v.clone(),
            })?;
        }
        if let Some(v) = get("HYDRO_STREAM") {
            config.stream = parse_flag(&v).ok_or(ConfigError::Invalid {
                key: "HYDRO_STREAM",
                value: v.clone(),
            })?;
        }

        Ok(config)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
