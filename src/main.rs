//! Main entry point for the price gateway

use price_serving_gateway::{
    config::Settings,
    gateway::{health_check::HealthCheckManager, server, Dispatcher, HttpRelay},
    logging,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = Settings::load("config/gateway.toml")?;
    logging::init(&settings.logging);
    settings.validate_dispatcher()?;

    info!("Starting price gateway");

    let config = &settings.dispatcher;
    let relay = HttpRelay::new(config.timeout_ms.map(Duration::from_millis), config.max_body_bytes)?;
    let dispatcher = Arc::new(Dispatcher::from_addresses(config.backends.as_slice(), relay)?);

    for backend in dispatcher.backends() {
        info!(backend = %backend.address(), "Registered backend");
    }

    // Liveness stays static unless the probe is enabled
    let health_manager = if config.health_check.enabled {
        let manager = HealthCheckManager::new(
            dispatcher.backends().to_vec(),
            config.health_check.clone(),
        )?;
        manager.start().await;
        Some(manager)
    } else {
        None
    };

    let app = server::create_router(dispatcher);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    info!("Gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    if let Some(manager) = health_manager {
        manager.stop().await;
    }

    Ok(())
}
