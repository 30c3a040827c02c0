use std::time::Duration;

use crate::ProductixError;
use secrecy::SecretString;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Settings for the text-completion backend used by AI analysis.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_key: SecretString,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ProductixError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Testable helper that reads configuration values using the provided
    /// function instead of the process environment.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, ProductixError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let api = get("PRODUCTIX_AI_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ProductixError::Config("PRODUCTIX_AI_API_KEY missing".into()))?;
        let base_url = get("PRODUCTIX_AI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into());
        let model = get("PRODUCTIX_AI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.into());
        let timeout_secs = match get("PRODUCTIX_AI_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                ProductixError::Config(format!("PRODUCTIX_AI_TIMEOUT_SECS is not a number: {raw}"))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        Ok(Self {
            api_key: SecretString::new(api.into()),
            base_url,
            model,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
