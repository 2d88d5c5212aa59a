//! Connectivity monitor
//!
//! Publishes the tri-state reachability signal on a watch channel. Starts as
//! `Unknown`; only a probe result moves it to `Online` or `Offline`.

use async_trait::async_trait;
use proofwork_client::JobApi;
use proofwork_core::domain::connectivity::Connectivity;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

/// Answers whether the backend can currently be reached
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn is_reachable(&self) -> bool;
}

/// Work to run each time the device comes back online
#[async_trait]
pub trait OnlineHandler: Send + Sync {
    async fn on_online(&self);
}

/// Probe that calls the backend health endpoint
///
/// Any HTTP answer, even an error status, proves the network path works.
/// Only a request that never got a response counts as offline.
pub struct ApiProbe {
    api: Arc<dyn JobApi>,
}

impl ApiProbe {
    pub fn new(api: Arc<dyn JobApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl ReachabilityProbe for ApiProbe {
    async fn is_reachable(&self) -> bool {
        match self.api.ping().await {
            Ok(()) => true,
            Err(e) if e.is_transport() => {
                debug!("Health check did not reach the backend: {}", e);
                false
            }
            Err(e) => {
                debug!("Health check answered with an error: {}", e);
                true
            }
        }
    }
}

pub struct ConnectivityMonitor {
    tx: watch::Sender<Connectivity>,
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectivityMonitor {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Connectivity::Unknown);
        Self { tx }
    }

    pub fn current(&self) -> Connectivity {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<Connectivity> {
        self.tx.subscribe()
    }

    /// Publishes a new state; returns false if it equals the current one
    pub fn set(&self, next: Connectivity) -> bool {
        let mut previous = next;
        let changed = self.tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            previous = *current;
            *current = next;
            true
        });

        if changed {
            info!("Connectivity changed: {} -> {}", previous, next);
        }
        changed
    }

    /// Runs the probe once and publishes its answer
    pub async fn probe_once(&self, probe: &dyn ReachabilityProbe) -> Connectivity {
        let state = Connectivity::from(probe.is_reachable().await);
        self.set(state);
        state
    }

    /// Starts probing at a fixed interval; the first probe runs immediately
    pub fn spawn_probe_loop(
        self: &Arc<Self>,
        probe: Arc<dyn ReachabilityProbe>,
        interval: Duration,
    ) -> JoinHandle<()> {
        let monitor = Arc::clone(self);

        tokio::spawn(async move {
            info!("Starting connectivity probe (interval: {:?})", interval);

            let mut ticker = time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                monitor.probe_once(probe.as_ref()).await;
            }
        })
    }

    /// Calls `handler` on every transition into `Online`
    ///
    /// Each call runs in its own task so a long sync never delays the next
    /// state change. The loop ends when the monitor is dropped.
    pub fn spawn_reconnect_loop(&self, handler: Arc<dyn OnlineHandler>) -> JoinHandle<()> {
        let mut rx = self.tx.subscribe();

        tokio::spawn(async move {
            let mut last = *rx.borrow_and_update();

            while rx.changed().await.is_ok() {
                let current = *rx.borrow_and_update();

                if current.is_online() && !last.is_online() {
                    debug!("Back online, triggering sync");
                    let handler = Arc::clone(&handler);
                    tokio::spawn(async move {
                        handler.on_online().await;
                    });
                }
                last = current;
            }
        })
    }
}
