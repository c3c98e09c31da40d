//! A prediction node as seen by the dispatcher

use axum::{body::Body, http::Request, response::Response};
use parking_lot::RwLock;
use reqwest::Url;
use std::time::Instant;
use tracing::{info, warn};

use super::relay::HttpRelay;
use crate::error::{AppError, Result};

/// Parse and check a configured backend base URL
pub fn parse_backend_url(address: &str) -> Result<Url> {
    let invalid = |reason: String| AppError::InvalidBackendAddress {
        address: address.to_string(),
        reason,
    };

    let url = Url::parse(address).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    if url.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }

    Ok(url)
}

/// Liveness record of a backend
#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub live: bool,
    pub last_check: Option<Instant>,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self {
            live: true, // live until a probe says otherwise
            last_check: None,
            consecutive_failures: 0,
            consecutive_successes: 0,
        }
    }
}

/// Backend node: address, liveness flag and forwarding handle
pub struct Backend {
    base: String,
    health: RwLock<HealthStatus>,
    relay: HttpRelay,
}

impl Backend {
    pub fn new(address: &str, relay: HttpRelay) -> Result<Self> {
        let url = parse_backend_url(address)?;
        let base = url.as_str().trim_end_matches('/').to_string();

        Ok(Self {
            base,
            health: RwLock::new(HealthStatus::default()),
            relay,
        })
    }

    /// Base URL without a trailing slash
    pub fn address(&self) -> &str {
        &self.base
    }

    pub fn is_live(&self) -> bool {
        self.health.read().live
    }

    pub fn set_live(&self, live: bool) {
        self.health.write().live = live;
    }

    pub fn health(&self) -> HealthStatus {
        self.health.read().clone()
    }

    /// Record one probe outcome; returns the new liveness if it flipped.
    pub fn record_probe(
        &self,
        success: bool,
        failure_threshold: u32,
        recovery_threshold: u32,
    ) -> Option<bool> {
        let mut status = self.health.write();
        status.last_check = Some(Instant::now());

        if success {
            status.consecutive_failures = 0;
            status.consecutive_successes = status.consecutive_successes.saturating_add(1);

            if !status.live && status.consecutive_successes >= recovery_threshold {
                status.live = true;
                info!(backend = %self.base, "Backend recovered and marked live");
                return Some(true);
            }
        } else {
            status.consecutive_successes = 0;
            status.consecutive_failures = status.consecutive_failures.saturating_add(1);

            if status.live && status.consecutive_failures >= failure_threshold {
                status.live = false;
                warn!(
                    backend = %self.base,
                    failures = status.consecutive_failures,
                    "Backend marked not live after consecutive failures"
                );
                return Some(false);
            }
        }

        None
    }

    /// Relay a request to this backend
    pub async fn forward(&self, request: Request<Body>) -> Result<Response> {
        self.relay.forward(&self.base, request).await
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("address", &self.base)
            .field("live", &self.is_live())
            .finish()
    }
}
