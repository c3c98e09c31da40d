//! Transparent HTTP relay to a single upstream

use axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{HeaderMap, Request, StatusCode},
    response::Response,
};
use http_body_util::LengthLimitError;
use reqwest::Client;
use std::net::SocketAddr;
use std::time::Duration;
use tracing::debug;

use crate::error::{AppError, Result};

/// Headers that describe a single connection and must not cross the relay
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| name.eq_ignore_ascii_case(h))
}

/// Forwarding handle: a pooled HTTP client plus inbound body limit
#[derive(Clone)]
pub struct HttpRelay {
    client: Client,
    max_body_bytes: usize,
}

impl HttpRelay {
    /// Build a relay. No timeout is applied unless `timeout` is set.
    ///
    /// Redirects are never followed: a 3xx from the backend goes back to the caller.
    pub fn new(timeout: Option<Duration>, max_body_bytes: usize) -> Result<Self> {
        let mut builder = Client::builder().redirect(reqwest::redirect::Policy::none());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            max_body_bytes,
        })
    }

    /// Forward `request` to `base` (joined with the inbound path and query) and
    /// relay the upstream status, headers and body back unchanged.
    pub async fn forward(&self, base: &str, request: Request<Body>) -> Result<Response> {
        let (parts, body) = request.into_parts();

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let target = format!("{}{}", base, path_and_query);

        let method = reqwest::Method::from_bytes(parts.method.as_str().as_bytes())
            .map_err(|e| AppError::InvalidRequest(format!("Unsupported method: {}", e)))?;

        let client_ip = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());
        let headers = outbound_headers(&parts.headers, client_ip.as_deref());

        let body = to_bytes(body, self.max_body_bytes)
            .await
            .map_err(|e| self.body_error(e))?;

        debug!(method = %method, target = %target, bytes = body.len(), "Relaying request");

        let upstream = self
            .client
            .request(method, &target)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = StatusCode::from_u16(upstream.status().as_u16())
            .map_err(|e| AppError::Internal(format!("Invalid upstream status: {}", e)))?;

        let mut builder = Response::builder().status(status);
        for (name, value) in upstream.headers() {
            if is_hop_by_hop(name.as_str()) {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_bytes());
        }

        let bytes = upstream.bytes().await?;
        builder
            .body(Body::from(bytes))
            .map_err(|e| AppError::Internal(format!("Failed to build relayed response: {}", e)))
    }

    /// Only an exceeded length limit is a 413; any other body failure is the client's.
    fn body_error(&self, error: axum::Error) -> AppError {
        if error.into_inner().downcast_ref::<LengthLimitError>().is_some() {
            AppError::PayloadTooLarge(self.max_body_bytes)
        } else {
            AppError::InvalidRequest("Failed to read request body".to_string())
        }
    }
}

/// Copy inbound headers into the client's header types, dropping hop-by-hop
/// headers and `host`, and appending the client to `x-forwarded-for`.
///
/// reqwest still adds `accept: */*` when the inbound request carried no `accept`.
fn outbound_headers(inbound: &HeaderMap, client_ip: Option<&str>) -> reqwest::header::HeaderMap {
    use reqwest::header::{HeaderName, HeaderValue};

    let mut headers = reqwest::header::HeaderMap::with_capacity(inbound.len() + 1);
    let mut forwarded_for: Option<String> = None;

    for (name, value) in inbound {
        let name = name.as_str();
        // content-length is recomputed from the buffered body
        if is_hop_by_hop(name) || name == "host" || name == "content-length" {
            continue;
        }
        if name == "x-forwarded-for" {
            if let Ok(prior) = value.to_str() {
                forwarded_for = Some(match forwarded_for {
                    Some(acc) => format!("{}, {}", acc, prior),
                    None => prior.to_string(),
                });
            }
            continue;
        }

        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_bytes(value.as_bytes()),
        ) {
            headers.append(name, value);
        }
    }

    let forwarded_for = match (forwarded_for, client_ip) {
        (Some(prior), Some(ip)) => Some(format!("{}, {}", prior, ip)),
        (Some(prior), None) => Some(prior),
        (None, Some(ip)) => Some(ip.to_string()),
        (None, None) => None,
    };
    if let Some(value) = forwarded_for.and_then(|v| HeaderValue::from_str(&v).ok()) {
        headers.insert(HeaderName::from_static("x-forwarded-for"), value);
    }

    headers
}
