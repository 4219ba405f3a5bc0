use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use super::error::Result;


pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;


#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrashConfig {
    pub max_attempts: u32,

    pub sweep_workers: usize,
    pub sweep_interval_secs: u64,

    pub lease_ttl_secs: u64,

    pub store_retries: u32,
    pub store_retry_delay_ms: u64,
}

impl TrashConfig {
    pub fn new() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            sweep_workers: 4,
            sweep_interval_secs: 60,
            lease_ttl_secs: 300,
            store_retries: 3,
            store_retry_delay_ms: 100,
        }
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn lease_ttl(&self) -> Duration {
        Duration::from_secs(self.lease_ttl_secs)
    }

    pub fn store_retry_delay(&self) -> Duration {
        Duration::from_millis(self.store_retry_delay_ms)
    }


    pub fn from_env() -> Self {
        let mut config = Self::new();

        if let Some(v) = env_parse("TRASH_MAX_ATTEMPTS") {
            config.max_attempts = v;
        }
        if let Some(v) = env_parse("TRASH_SWEEP_WORKERS") {
            config.sweep_workers = v;
        }
        if let Some(v) = env_parse("TRASH_SWEEP_INTERVAL_SECS") {
            config.sweep_interval_secs = v;
        }
        if let Some(v) = env_parse("TRASH_LEASE_TTL_SECS") {
            config.lease_ttl_secs = v;
        }
        if let Some(v) = env_parse("TRASH_STORE_RETRIES") {
            config.store_retries = v;
        }
        if let Some(v) = env_parse("TRASH_STORE_RETRY_DELAY_MS") {
            config.store_retry_delay_ms = v;
        }

        config
    }

    /// Layers an optional config file under `TRASH_*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(false));
        }
        let config = builder
            .add_source(Environment::with_prefix("TRASH").try_parsing(true))
            .build()?
            .try_deserialize::<TrashConfig>()?;

        Ok(config.sanitized())
    }

    fn sanitized(mut self) -> Self {
        if self.sweep_workers == 0 {
            self.sweep_workers = 1;
        }
        if self.store_retries == 0 {
            self.store_retries = 1;
        }
        self
    }
}

impl Default for TrashConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrashConfig::default();
        assert_eq!(config.max_attempts, 20);
        assert_eq!(config.sweep_workers, 4);
        assert_eq!(config.lease_ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = TrashConfig::load(None).unwrap();
        assert!(config.sweep_workers >= 1);
        assert!(config.store_retries >= 1);
    }

    #[test]
    fn test_sanitized_zero_workers() {
        let config = TrashConfig {
            sweep_workers: 0,
            ..TrashConfig::default()
        }
        .sanitized();
        assert_eq!(config.sweep_workers, 1);
    }
}
