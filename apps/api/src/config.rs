use std::fmt;

use anyhow::{Context, Result};

use crate::llm_client::ConfigError;

/// Single-key variables read in order, ahead of the `GEMINI_API_KEYS` list.
const KEY_VARS: [&str; 5] = [
    "GEMINI_API_KEY",
    "GEMINI_API_KEY1",
    "GEMINI_API_KEY2",
    "GEMINI_API_KEY3",
    "GEMINI_API_KEY4",
];
const KEY_LIST_VAR: &str = "GEMINI_API_KEYS";

/// Application configuration loaded from environment variables.
/// Startup fails if no usable API key is configured.
#[derive(Clone)]
pub struct Config {
    /// Ordered, non-blank; becomes the credential pool.
    pub api_keys: Vec<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_keys = collect_api_keys(&lookup);
        if api_keys.is_empty() {
            return Err(ConfigError::NoCredentials.into());
        }

        Ok(Config {
            api_keys,
            port: lookup("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn collect_api_keys(lookup: &impl Fn(&str) -> Option<String>) -> Vec<String> {
    let singles = KEY_VARS.iter().filter_map(|var| lookup(*var));
    let listed = lookup(KEY_LIST_VAR)
        .map(|list| list.split(',').map(str::to_string).collect::<Vec<_>>())
        .unwrap_or_default();

    singles
        .chain(listed)
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_keys", &format_args!("[{} redacted]", self.api_keys.len()))
            .field("port", &self.port)
            .field("rust_log", &self.rust_log)
            .finish()
    }
}
