//! Round-robin dispatcher over a fixed backend list

use axum::{body::Body, http::Request, response::Response};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::backend::Backend;
use super::relay::HttpRelay;
use crate::error::{AppError, Result};

/// Distributes requests across backends in strict cyclic order.
///
/// The backend list is fixed at construction. The cursor is the only state
/// mutated by requests.
pub struct Dispatcher {
    backends: Vec<Arc<Backend>>,
    cursor: AtomicU64,
}

impl Dispatcher {
    pub fn new(backends: Vec<Arc<Backend>>) -> Self {
        Self {
            backends,
            cursor: AtomicU64::new(0),
        }
    }

    /// Build backends from configured addresses, all sharing `relay`
    pub fn from_addresses<S: AsRef<str>>(addresses: &[S], relay: HttpRelay) -> Result<Self> {
        let backends = addresses
            .iter()
            .map(|address| Backend::new(address.as_ref(), relay.clone()).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self::new(backends))
    }

    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    /// Current cursor value (number of selections made so far)
    pub fn cursor(&self) -> u64 {
        self.cursor.load(Ordering::Relaxed)
    }

    /// Advance the cursor and return `backends[cursor % len]`.
    ///
    /// The increment and the read are one atomic step, so concurrent callers
    /// observe a single strictly increasing sequence.
    pub fn select_backend(&self) -> Result<Arc<Backend>> {
        if self.backends.is_empty() {
            return Err(AppError::NoBackends);
        }

        let next = self.cursor.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        let index = (next % self.backends.len() as u64) as usize;

        Ok(self.backends[index].clone())
    }

    /// Select a backend and relay `request` to it.
    ///
    /// A backend that is not live rejects the request outright; there is no
    /// retry against another backend, and relay failures are not failed over.
    pub async fn handle_request(&self, request: Request<Body>) -> Result<Response> {
        let request_id = Uuid::new_v4();
        let backend = self.select_backend().map_err(|e| {
            warn!(request_id = %request_id, "No backends to dispatch to");
            e
        })?;

        if !backend.is_live() {
            warn!(
                request_id = %request_id,
                backend = %backend.address(),
                "Selected backend is not live"
            );
            return Err(AppError::BackendUnavailable(backend.address().to_string()));
        }

        debug!(
            request_id = %request_id,
            backend = %backend.address(),
            method = %request.method(),
            uri = %request.uri(),
            "Dispatching request"
        );

        backend.forward(request).await.map_err(|e| {
            warn!(
                request_id = %request_id,
                backend = %backend.address(),
                error = %e,
                "Relay failed"
            );
            e
        })
    }
}
