//! Field engine configuration
//!
//! Defines the backend connection, where local state is kept, and how often
//! the network is probed.

use std::path::PathBuf;
use std::time::Duration;

/// Field engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend base URL (e.g., "http://localhost:8080")
    pub api_url: String,

    /// Opaque bearer token attached to every request
    pub api_token: Option<String>,

    /// Directory holding the outbox file and cached job snapshots
    pub data_dir: PathBuf,

    /// How often the reachability probe runs
    pub probe_interval: Duration,

    /// Per-request HTTP timeout
    pub request_timeout: Duration,
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(api_url: String) -> Self {
        Self {
            api_url,
            api_token: None,
            data_dir: PathBuf::from(".proofwork"),
            probe_interval: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - PROOFWORK_API_URL (required)
    /// - PROOFWORK_API_TOKEN (optional)
    /// - PROOFWORK_DATA_DIR (optional, default: .proofwork)
    /// - PROOFWORK_PROBE_INTERVAL (optional, seconds, default: 10)
    /// - PROOFWORK_REQUEST_TIMEOUT (optional, seconds, default: 30)
    pub fn from_env() -> anyhow::Result<Self> {
        let api_url = std::env::var("PROOFWORK_API_URL")
            .map_err(|_| anyhow::anyhow!("PROOFWORK_API_URL environment variable not set"))?;

        let mut config = Self::new(api_url);

        config.api_token = std::env::var("PROOFWORK_API_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());

        if let Ok(dir) = std::env::var("PROOFWORK_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        if let Some(secs) = env_secs("PROOFWORK_PROBE_INTERVAL") {
            config.probe_interval = secs;
        }

        if let Some(secs) = env_secs("PROOFWORK_REQUEST_TIMEOUT") {
            config.request_timeout = secs;
        }

        Ok(config)
    }

    /// Location of the durable outbox queue
    pub fn outbox_path(&self) -> PathBuf {
        self.data_dir.join("outbox.json")
    }

    /// Directory of cached job snapshots
    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("jobs")
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_url.is_empty() {
            anyhow::bail!("api_url cannot be empty");
        }

        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            anyhow::bail!("api_url must start with http:// or https://");
        }

        if self.data_dir.as_os_str().is_empty() {
            anyhow::bail!("data_dir cannot be empty");
        }

        if self.probe_interval.is_zero() {
            anyhow::bail!("probe_interval must be greater than 0");
        }

        if self.request_timeout.is_zero() {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        Ok(())
    }
}

fn env_secs(name: &str) -> Option<Duration> {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_secs)
}

impl Default for Config {
    fn default() -> Self {
        Self::new("http://localhost:8080".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.probe_interval, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.outbox_path(), PathBuf::from(".proofwork/outbox.json"));
        assert_eq!(config.cache_dir(), PathBuf::from(".proofwork/jobs"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.api_url = "not-a-url".to_string();
        assert!(config.validate().is_err());

        config.api_url = "https://field.example.com".to_string();
        assert!(config.validate().is_ok());

        config.probe_interval = Duration::ZERO;
        assert!(config.validate().is_err());

        config.probe_interval = Duration::from_secs(5);
        config.data_dir = PathBuf::new();
        assert!(config.validate().is_err());
    }
}
