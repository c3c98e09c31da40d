//! Optional liveness probe driving each backend's `live` flag

use futures::future::join_all;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::backend::Backend;
use crate::config::HealthCheckConfig;
use crate::error::{AppError, Result};

/// Health check manager
pub struct HealthCheckManager {
    backends: Vec<Arc<Backend>>,
    client: Client,
    config: HealthCheckConfig,
    check_task: RwLock<Option<JoinHandle<()>>>,
}

impl HealthCheckManager {
    /// Create a new health check manager
    pub fn new(backends: Vec<Arc<Backend>>, config: HealthCheckConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            backends,
            client,
            config,
            check_task: RwLock::new(None),
        })
    }

    /// Probe every backend once, concurrently
    pub async fn check_all(&self) {
        probe_all(&self.client, &self.backends, &self.config).await;
    }

    /// Start the background probe loop
    pub async fn start(&self) {
        let backends = self.backends.clone();
        let client = self.client.clone();
        let config = self.config.clone();
        let interval_secs = config.interval_secs;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
            loop {
                ticker.tick().await;
                probe_all(&client, &backends, &config).await;
            }
        });

        *self.check_task.write().await = Some(handle);
        info!(interval_secs = interval_secs, "Started health check background task");
    }

    /// Stop the background probe loop
    pub async fn stop(&self) {
        if let Some(handle) = self.check_task.write().await.take() {
            handle.abort();
            info!("Stopped health check background task");
        }
    }

    /// Get health summary (total, live, not live)
    pub fn summary(&self) -> (usize, usize, usize) {
        let total = self.backends.len();
        let live = self.backends.iter().filter(|b| b.is_live()).count();
        (total, live, total - live)
    }
}

async fn probe_all(client: &Client, backends: &[Arc<Backend>], config: &HealthCheckConfig) {
    let probes = backends.iter().map(|backend| async move {
        let url = format!("{}{}", backend.address(), config.path);
        let success = match client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(backend = %backend.address(), error = %e, "Health probe failed");
                false
            }
        };

        backend.record_probe(success, config.failure_threshold, config.recovery_threshold);

        let status = backend.health();
        debug!(
            backend = %backend.address(),
            success = success,
            live = status.live,
            consecutive_failures = status.consecutive_failures,
            consecutive_successes = status.consecutive_successes,
            "Health check completed"
        );
    });

    join_all(probes).await;
}
