//! Configuration module
//!
//! Global CLI flags shared by every command, mapped onto the field engine
//! configuration.

use clap::Args;
use proofwork_field::Config;
use std::path::PathBuf;
use std::time::Duration;

/// Connection and storage flags
#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Backend URL
    #[arg(
        long,
        global = true,
        env = "PROOFWORK_API_URL",
        default_value = "http://localhost:8080"
    )]
    pub api_url: String,

    /// Bearer token sent with every request
    #[arg(long, global = true, env = "PROOFWORK_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Directory holding the outbox and cached jobs
    #[arg(long, global = true, env = "PROOFWORK_DATA_DIR", default_value = ".proofwork")]
    pub data_dir: PathBuf,

    /// Seconds between reachability probes
    #[arg(long, global = true, env = "PROOFWORK_PROBE_INTERVAL", default_value_t = 10)]
    pub probe_interval: u64,

    /// HTTP request timeout in seconds
    #[arg(long, global = true, env = "PROOFWORK_REQUEST_TIMEOUT", default_value_t = 30)]
    pub request_timeout: u64,
}

impl GlobalArgs {
    /// Builds the field engine configuration
    pub fn to_config(&self) -> Config {
        let mut config = Config::new(self.api_url.clone());
        config.api_token = self.api_token.clone().filter(|t| !t.is_empty());
        config.data_dir = self.data_dir.clone();
        config.probe_interval = Duration::from_secs(self.probe_interval);
        config.request_timeout = Duration::from_secs(self.request_timeout);
        config
    }
}
