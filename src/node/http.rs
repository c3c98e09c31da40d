//! HTTP routes of a prediction node

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{services::ServeFile, trace::TraceLayer};

use super::service::PredictionService;
use crate::error::Result;

/// Create the node router.
///
/// `index_path` is served as-is at `/`.
pub fn create_router(service: Arc<PredictionService>, index_path: &str) -> Router {
    Router::new()
        .route("/predict", post(predict).options(preflight))
        .route("/health", get(health))
        .route_service("/", ServeFile::new(index_path))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(service)
}

async fn predict(State(service): State<Arc<PredictionService>>, body: Bytes) -> Response {
    let result: Result<Response> = service.respond(&body).map(|encoded| {
        (
            [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            encoded,
        )
            .into_response()
    });

    with_allow_origin(result.into_response())
}

async fn preflight() -> Response {
    let mut response = StatusCode::NO_CONTENT.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );

    with_allow_origin(response)
}

async fn health() -> &'static str {
    "OK"
}

fn with_allow_origin(mut response: Response) -> Response {
    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    response
}
