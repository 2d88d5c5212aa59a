//! Field context
//!
//! Wires the shared services every job session works against:
//! - Backend API
//! - Outbox queue and job snapshot cache
//! - Connectivity monitor
//! - Sync reconciler

use anyhow::{Context as AnyhowContext, Result};
use proofwork_client::{FieldApiClient, JobApi};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::config::Config;
use crate::scheduler::{ApiProbe, ConnectivityMonitor, OnlineHandler};
use crate::service::{FileJobCache, FileOutbox, JobCache, OutboxQueue, SyncReconciler};
use crate::session::JobSession;

/// Services shared by every open job on this device
pub struct FieldContext {
    pub config: Config,
    pub api: Arc<dyn JobApi>,
    pub outbox: Arc<dyn OutboxQueue>,
    pub cache: Arc<dyn JobCache>,
    pub monitor: Arc<ConnectivityMonitor>,
    pub reconciler: Arc<SyncReconciler>,
}

impl FieldContext {
    /// Builds the production context: HTTP client plus file-backed storage
    pub fn from_config(config: Config) -> Result<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;

        let mut client = FieldApiClient::with_client(config.api_url.clone(), http);
        if let Some(token) = &config.api_token {
            client = client.with_token(token.clone());
        }

        let outbox = FileOutbox::open(config.outbox_path()).context("Failed to open outbox")?;
        let cache = FileJobCache::new(config.cache_dir());

        info!(
            "Field context ready: api_url={}, data_dir={}",
            config.api_url,
            config.data_dir.display()
        );

        Ok(Self::new(
            config,
            Arc::new(client),
            Arc::new(outbox),
            Arc::new(cache),
        ))
    }

    /// Assembles a context from already built services
    pub fn new(
        config: Config,
        api: Arc<dyn JobApi>,
        outbox: Arc<dyn OutboxQueue>,
        cache: Arc<dyn JobCache>,
    ) -> Self {
        let reconciler = Arc::new(SyncReconciler::new(
            Arc::clone(&api),
            Arc::clone(&outbox),
            Arc::clone(&cache),
        ));

        Self {
            config,
            api,
            outbox,
            cache,
            monitor: Arc::new(ConnectivityMonitor::new()),
            reconciler,
        }
    }

    /// Health-check probe over this context's backend
    pub fn probe(&self) -> ApiProbe {
        ApiProbe::new(Arc::clone(&self.api))
    }

    /// Starts the probe and reconnect loops
    ///
    /// The reconnect loop is subscribed first so the very first successful
    /// probe already counts as a transition into `Online`.
    pub fn start_background(&self, handler: Arc<dyn OnlineHandler>) -> Vec<tokio::task::JoinHandle<()>> {
        let reconnect = self.monitor.spawn_reconnect_loop(handler);
        let probe = self
            .monitor
            .spawn_probe_loop(Arc::new(self.probe()), self.config.probe_interval);
        vec![reconnect, probe]
    }

    /// Opens a job session against this context
    pub async fn open_job(&self, job_id: Uuid) -> crate::error::Result<JobSession> {
        JobSession::open(self, job_id).await
    }
}
