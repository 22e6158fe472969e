//! Connection settings, resolved from the command line, the environment and `.env`.

use thiserror::Error;

pub const URL_VAR: &str = "IMMICH_URL";
pub const API_KEY_VAR: &str = "IMMICH_API_KEY";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is not set")]
    Missing(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub immich_url: String,
    pub api_key: String,
}

impl Settings {
    /// Builds settings from values that were already looked up (flag first, then
    /// environment). Blank values count as missing.
    pub fn resolve(
        immich_url: Option<String>,
        api_key: Option<String>,
    ) -> Result<Self, ConfigError> {
        let immich_url = non_blank(immich_url).ok_or(ConfigError::Missing(URL_VAR))?;
        let api_key = non_blank(api_key).ok_or(ConfigError::Missing(API_KEY_VAR))?;
        Ok(Self {
            immich_url: immich_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
