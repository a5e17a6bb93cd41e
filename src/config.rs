use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use dotenvy::dotenv;
use url::Url;

/// Tunables of the question engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub cleanup_batch_size: usize,
    pub cleanup_batch_pause: Duration,
    /// Pause between a timeout notice and the next question.
    pub timeout_grace: Duration,
    pub completed_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cleanup_batch_size: 10,
            cleanup_batch_pause: Duration::from_millis(1000),
            timeout_grace: Duration::from_millis(1500),
            completed_capacity: 1000,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        dotenv().ok();
        let defaults = Self::default();
        Self {
            cleanup_batch_size: env_or("CLEANUP_BATCH_SIZE", defaults.cleanup_batch_size),
            cleanup_batch_pause: Duration::from_millis(env_or(
                "CLEANUP_BATCH_PAUSE_MS",
                defaults.cleanup_batch_pause.as_millis() as u64,
            )),
            timeout_grace: Duration::from_millis(env_or(
                "TIMEOUT_GRACE_MS",
                defaults.timeout_grace.as_millis() as u64,
            )),
            completed_capacity: env_or("COMPLETED_CAPACITY", defaults.completed_capacity),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    pub database_url: String,
    pub log_level: tracing::Level,
    pub webhook: Option<(Url, SocketAddr)>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} should be set.")]
    Missing(&'static str),
    #[error("{0} can't be parsed.")]
    Invalid(&'static str),
}

impl BotConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let token = required("TELOXIDE_TOKEN")?;
        let database_url = required("DATABASE_URL")?;
        let log_level = std::env::var("LOG_LEVEL")
            .unwrap_or_else(|_| "error".into())
            .parse()
            .map_err(|_| ConfigError::Invalid("LOG_LEVEL"))?;

        let ngrok_url = optional::<Url>("NGROK_URL")?;
        let ngrok_addr = optional::<SocketAddr>("NGROK_ADDR")?;

        Ok(Self {
            token,
            database_url,
            log_level,
            webhook: ngrok_url.zip(ngrok_addr),
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::Missing(key))
}

fn optional<T: FromStr>(key: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse().map(Some).map_err(|_| ConfigError::Invalid(key)),
        Err(_) => Ok(None),
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            tracing::warn!(key, raw = %raw, "malformed value, using default");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_values_fall_back() {
        std::env::set_var("QUIZENGINE_TEST_BATCH", "ten");
        assert_eq!(env_or("QUIZENGINE_TEST_BATCH", 10usize), 10);
        std::env::set_var("QUIZENGINE_TEST_BATCH", "4");
        assert_eq!(env_or("QUIZENGINE_TEST_BATCH", 10usize), 4);
    }

    #[test]
    fn defaults_are_sane() {
        let config = EngineConfig::default();
        assert_eq!(config.cleanup_batch_size, 10);
        assert!(config.timeout_grace < Duration::from_secs(5));
    }
}
