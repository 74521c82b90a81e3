//! Runtime configuration
//!
//! Built once by the host (usually from the environment) and passed down
//! explicitly. Nothing below this module reads the environment.

use std::time::Duration;
use thiserror::Error;

/// Default idle timeout between chunks before a reply is treated as stalled
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Default byte count per chunk when replaying captured bodies from disk
pub const DEFAULT_READ_CHUNK_SIZE: usize = 4096;

pub const DEFAULT_LOG_FILTER: &str = "grok_stream=info";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Configuration for driving a reconstruction from a transcript source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamConfig {
    /// Give up waiting for the next chunk after this long. `None` waits forever.
    pub idle_timeout: Option<Duration>,
    pub read_chunk_size: usize,
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl StreamConfig {
    /// Read `GROK_IDLE_TIMEOUT_SECS` (0 disables), `GROK_READ_CHUNK_SIZE`
    /// and `GROK_LOG`, falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup("GROK_IDLE_TIMEOUT_SECS") {
            let secs: u64 = parse_number("GROK_IDLE_TIMEOUT_SECS", &raw)?;
            config.idle_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }

        if let Some(raw) = lookup("GROK_READ_CHUNK_SIZE") {
            let size: usize = parse_number("GROK_READ_CHUNK_SIZE", &raw)?;
            if size == 0 {
                return Err(ConfigError::Invalid {
                    key: "GROK_READ_CHUNK_SIZE",
                    value: raw,
                    reason: "must be greater than zero".to_string(),
                });
            }
            config.read_chunk_size = size;
        }

        if let Some(filter) = lookup("GROK_LOG") {
            if !filter.trim().is_empty() {
                config.log_filter = filter;
            }
        }

        Ok(config)
    }
}

fn parse_number<T>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}
