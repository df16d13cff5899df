use std::env;
use std::time::Duration;

use crate::error::{Error, Result};

const DEFAULT_POLL_INTERVAL_SECS: u64 = 600;

/// Runtime settings, read once at startup.
pub struct Config {
    pub practicum_token: String,
    pub telegram_token: String,
    pub telegram_chat_id: String,
    pub poll_interval: Duration,
}

impl Config {
    /// Read settings from the environment.
    ///
    /// The three credentials are required; a missing or blank value is a
    /// configuration error and the caller is expected to abort on it.
    pub fn from_env() -> Result<Self> {
        let practicum_token = require("PRACTICUM_TOKEN")?;
        let telegram_token = require("TELEGRAM_TOKEN")?;
        let telegram_chat_id = require("TELEGRAM_CHAT_ID")?;

        let poll_interval = env::var("POLL_INTERVAL_SECS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS));

        Ok(Self {
            practicum_token,
            telegram_token,
            telegram_chat_id,
            poll_interval,
        })
    }
}

fn require(name: &str) -> Result<String> {
    non_empty(env::var(name).ok()).ok_or_else(|| Error::Config(format!("{name} must be set")))
}

/// Treat empty and whitespace-only values as unset.
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|val| !val.trim().is_empty())
}
