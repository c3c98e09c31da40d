//! HTTP front end of the dispatcher

use axum::{body::Body, extract::State, http::Request, response::Response, Router};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::dispatcher::Dispatcher;
use crate::error::Result;

/// Every path and method is relayed; the dispatcher has no routes of its own.
pub fn create_router(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(dispatcher)
}

async fn dispatch(State(dispatcher): State<Arc<Dispatcher>>, request: Request<Body>) -> Result<Response> {
    dispatcher.handle_request(request).await
}
