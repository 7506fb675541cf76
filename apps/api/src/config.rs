use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::screening::similarity::ScoringStrategy;
use crate::screening::vectorizer::TermFrequency;

const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Every setting has a default; malformed values fail startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub scoring_strategy: ScoringStrategy,
    pub term_frequency: TermFrequency,
    pub extraction_timeout: Duration,
    pub max_upload_bytes: usize,
    /// Sessions idle longer than this are dropped.
    pub session_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            rust_log: "info".to_string(),
            scoring_strategy: ScoringStrategy::Cosine,
            term_frequency: TermFrequency::Raw,
            extraction_timeout: Duration::from_secs(10),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            session_ttl: Duration::from_secs(60 * 60),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = Config::default();

        Ok(Config {
            port: parse_env("PORT", defaults.port)
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or(defaults.rust_log),
            scoring_strategy: parse_env("SCORING_STRATEGY", defaults.scoring_strategy)?,
            term_frequency: parse_env("TERM_FREQUENCY", defaults.term_frequency)?,
            extraction_timeout: Duration::from_secs(
                parse_env("EXTRACTION_TIMEOUT_SECS", defaults.extraction_timeout.as_secs())
                    .context("EXTRACTION_TIMEOUT_SECS must be a whole number of seconds")?,
            ),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            session_ttl: Duration::from_secs(
                parse_env("SESSION_TTL_SECS", defaults.session_ttl.as_secs())
                    .context("SESSION_TTL_SECS must be a whole number of seconds")?,
            ),
        })
    }
}

/// Reads `key` and parses it, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow!("Invalid value '{raw}' for environment variable '{key}': {e}")),
        Err(_) => Ok(default),
    }
}
