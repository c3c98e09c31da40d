//! Functional tests for round-robin dispatch and relaying

use axum::{
    body::{to_bytes, Body, Bytes},
    http::{Request, StatusCode},
};
use price_serving_gateway::config::HealthCheckConfig;
use price_serving_gateway::gateway::{
    health_check::HealthCheckManager, server, Backend, Dispatcher, HttpRelay,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PREDICT_BODY: &str = r#"{"House":{"Size":100,"Bedrooms":3,"Age":5,"Location":"A"}}"#;

fn relay() -> HttpRelay {
    HttpRelay::new(Some(Duration::from_secs(5)), 1024 * 1024).unwrap()
}

fn predict_request() -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header("content-type", "application/json")
        .body(Body::from(PREDICT_BODY))
        .unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_selection_is_fair() {
    let addresses = ["http://10.0.0.1:8000", "http://10.0.0.2:8000", "http://10.0.0.3:8000"];
    let dispatcher = Arc::new(Dispatcher::from_addresses(&addresses, relay()).unwrap());

    let calls = 3_001;
    let tasks: Vec<_> = (0..calls)
        .map(|_| {
            let dispatcher = dispatcher.clone();
            tokio::spawn(async move {
                dispatcher.select_backend().unwrap().address().to_string()
            })
        })
        .collect();

    let mut counts: HashMap<String, usize> = HashMap::new();
    for task in tasks {
        *counts.entry(task.await.unwrap()).or_default() += 1;
    }

    assert_eq!(counts.len(), 3);
    let (floor, ceil) = (calls / 3, (calls + 2) / 3);
    for (address, count) in &counts {
        assert!(
            *count == floor || *count == ceil,
            "{address} selected {count} times"
        );
    }
    assert_eq!(dispatcher.cursor(), calls as u64);
}

#[test]
fn test_selection_is_fair_across_threads() {
    let addresses = ["http://10.0.0.1:8000", "http://10.0.0.2:8000"];
    let dispatcher = Arc::new(Dispatcher::from_addresses(&addresses, relay()).unwrap());

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let dispatcher = dispatcher.clone();
            std::thread::spawn(move || {
                (0..1_000)
                    .filter(|_| dispatcher.select_backend().unwrap().address().ends_with(".1:8000"))
                    .count()
            })
        })
        .collect();

    let first: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(first, 5_000);
}

#[tokio::test]
async fn test_requests_alternate_between_backends() {
    let first = MockServer::start().await;
    let second = MockServer::start().await;

    for (server, price) in [(&first, "1.0"), (&second, "2.0")] {
        Mock::given(method("POST"))
            .and(path("/predict"))
            .and(body_string(PREDICT_BODY))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(format!(r#"{{"Price":{}}}"#, price), "application/json"),
            )
            .expect(2)
            .mount(server)
            .await;
    }

    let dispatcher = Dispatcher::from_addresses(&[first.uri(), second.uri()], relay()).unwrap();
    let app = server::create_router(Arc::new(dispatcher));

    let mut bodies = Vec::new();
    for _ in 0..4 {
        let response = app.clone().oneshot(predict_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "application/json");
        bodies.push(body_text(response).await);
    }

    // first increment lands on the second backend
    assert_eq!(
        bodies,
        vec![r#"{"Price":2.0}"#, r#"{"Price":1.0}"#, r#"{"Price":2.0}"#, r#"{"Price":1.0}"#]
    );
}

#[tokio::test]
async fn test_upstream_status_and_body_are_relayed() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Invalid request format\n"))
        .expect(1)
        .mount(&upstream)
        .await;

    let dispatcher = Dispatcher::from_addresses(&[upstream.uri()], relay()).unwrap();
    let app = server::create_router(Arc::new(dispatcher));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/predict")
                .body(Body::from("{broken"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "Invalid request format\n");
}

#[tokio::test]
async fn test_method_path_query_and_headers_are_forwarded() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reports/latest"))
        .and(query_param("limit", "5"))
        .and(header("x-client", "survey"))
        .and(header("accept", "text/csv"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&upstream)
        .await;

    let dispatcher = Dispatcher::from_addresses(&[format!("{}/", upstream.uri())], relay()).unwrap();
    let app = server::create_router(Arc::new(dispatcher));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/reports/latest?limit=5")
                .header("x-client", "survey")
                .header("accept", "text/csv")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn test_redirect_is_relayed_not_followed() {
    let upstream = MockServer::start().await;
    let elsewhere = MockServer::start().await;
    let location = format!("{}/moved", elsewhere.uri());

    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", location.as_str()))
        .expect(1)
        .mount(&upstream)
        .await;
    Mock::given(path("/moved"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&elsewhere)
        .await;

    let dispatcher = Dispatcher::from_addresses(&[upstream.uri()], relay()).unwrap();
    let app = server::create_router(Arc::new(dispatcher));

    let response = app.oneshot(predict_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(response.headers()["location"], location.as_str());
}

#[tokio::test]
async fn test_backend_not_live_is_rejected_without_forwarding() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let backend = Arc::new(Backend::new(&upstream.uri(), relay()).unwrap());
    backend.set_live(false);
    let app = server::create_router(Arc::new(Dispatcher::new(vec![backend])));

    let response = app.oneshot(predict_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body_text(response).await, "Service not available");
}

#[tokio::test]
async fn test_not_live_backend_does_not_fail_over() {
    let live = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"Price":1.0}"#))
        .expect(1)
        .mount(&live)
        .await;

    let dead = Arc::new(Backend::new("http://127.0.0.1:9", relay()).unwrap());
    dead.set_live(false);
    let alive = Arc::new(Backend::new(&live.uri(), relay()).unwrap());

    // cursor 1 selects the dead backend, cursor 2 the live one
    let app = server::create_router(Arc::new(Dispatcher::new(vec![alive, dead])));

    let rejected = app.clone().oneshot(predict_request()).await.unwrap();
    assert_eq!(rejected.status(), StatusCode::SERVICE_UNAVAILABLE);

    let served = app.oneshot(predict_request()).await.unwrap();
    assert_eq!(served.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_empty_backend_set_is_unavailable() {
    let app = server::create_router(Arc::new(Dispatcher::new(vec![])));

    for _ in 0..3 {
        let response = app.clone().oneshot(predict_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}

#[tokio::test]
async fn test_unreachable_backend_is_bad_gateway() {
    let dispatcher = Dispatcher::from_addresses(&["http://127.0.0.1:1"], relay()).unwrap();
    let app = server::create_router(Arc::new(dispatcher));

    let response = app.oneshot(predict_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let relay = HttpRelay::new(None, 16).unwrap();
    let dispatcher = Dispatcher::from_addresses(&[upstream.uri()], relay).unwrap();
    let app = server::create_router(Arc::new(dispatcher));

    let response = app.oneshot(predict_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_broken_request_body_is_client_error() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&upstream)
        .await;

    let dispatcher = Dispatcher::from_addresses(&[upstream.uri()], relay()).unwrap();
    let app = server::create_router(Arc::new(dispatcher));

    let chunks = futures::stream::iter(vec![
        Ok(Bytes::from_static(b"{\"House\":")),
        Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "client went away")),
    ]);
    let request = Request::builder()
        .method("POST")
        .uri("/predict")
        .body(Body::from_stream(chunks))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_probe_flips_liveness() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&upstream)
        .await;

    let backend = Arc::new(Backend::new(&upstream.uri(), relay()).unwrap());
    let config = HealthCheckConfig {
        enabled: true,
        failure_threshold: 2,
        recovery_threshold: 1,
        ..HealthCheckConfig::default()
    };
    let manager = HealthCheckManager::new(vec![backend.clone()], config).unwrap();

    manager.check_all().await;
    assert!(backend.is_live());
    manager.check_all().await;
    assert!(!backend.is_live());
    assert_eq!(manager.summary(), (1, 0, 1));

    upstream.reset().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&upstream)
        .await;

    manager.check_all().await;
    assert!(backend.is_live());
}
