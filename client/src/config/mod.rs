//! Client configuration.
//!
//! Values come from environment variables (optionally loaded from a `.env`
//! file): the API base URL, where the durable session file lives, the request
//! timeout and the capacity of the session event channel.

use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub storage_path: PathBuf,
    pub request_timeout_seconds: u64,
    pub event_channel_capacity: usize,
}

impl Config {
    pub const DEFAULT_STORAGE_PATH: &'static str = ".session/storage.json";

    /// Builds a configuration with defaults for everything but the base URL.
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: normalize_base_url(api_base_url.into()),
            storage_path: PathBuf::from(Self::DEFAULT_STORAGE_PATH),
            request_timeout_seconds: 30,
            event_channel_capacity: 64,
        }
    }

    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let api_base_url = env::var("API_BASE_URL").context("API_BASE_URL not set")?;

        let storage_path = env::var("SESSION_STORAGE_PATH")
            .unwrap_or_else(|_| Self::DEFAULT_STORAGE_PATH.to_string());

        let request_timeout_seconds = env::var("REQUEST_TIMEOUT_SECONDS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<u64>()
            .context("REQUEST_TIMEOUT_SECONDS must be a valid number")?;

        let event_channel_capacity = env::var("EVENT_CHANNEL_CAPACITY")
            .unwrap_or_else(|_| "64".to_string())
            .parse::<usize>()
            .context("EVENT_CHANNEL_CAPACITY must be a valid number")?;

        if event_channel_capacity == 0 {
            anyhow::bail!("EVENT_CHANNEL_CAPACITY must be greater than zero");
        }

        Ok(Config {
            api_base_url: normalize_base_url(api_base_url),
            storage_path: PathBuf::from(storage_path),
            request_timeout_seconds,
            event_channel_capacity,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// Endpoint paths are relative (`users/sign_in`), so the base always ends in `/`.
fn normalize_base_url(mut base_url: String) -> String {
    if !base_url.ends_with('/') {
        base_url.push('/');
    }
    base_url
}
