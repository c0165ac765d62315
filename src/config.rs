// src/config.rs
use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

pub struct Config {
    pub store_url: String,
    pub store_auth: Option<String>,
    pub users_path: String,
    pub polls_path: String,
    pub session_file: PathBuf,
    pub http_timeout: Option<Duration>,
}

impl Config {
    /// Read settings from the environment, picking up a `.env` file first if there is one.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let store_url = var("STORE_URL").ok_or_else(|| anyhow!("STORE_URL must be set"))?;
        let http_timeout = match var("HTTP_TIMEOUT_SECS") {
            Some(raw) => Some(Duration::from_secs(parse("HTTP_TIMEOUT_SECS", &raw)?)),
            None => None,
        };

        Ok(Self {
            store_url,
            store_auth: var("STORE_AUTH"),
            users_path: try_load("USERS_PATH", "users")?,
            polls_path: try_load("POLLS_PATH", "polls")?,
            session_file: try_load("SESSION_FILE", ".poll-session.json")?,
            http_timeout,
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse<T: FromStr>(key: &str, raw: &str) -> Result<T>
where
    T::Err: Display,
{
    raw.trim().parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        anyhow!("invalid {key} value {raw:?}: {e}")
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> Result<T>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    parse(key, &raw).with_context(|| format!("loading {key}"))
}
