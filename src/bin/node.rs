//! Main entry point for a prediction node

use price_serving_gateway::{
    config::Settings,
    logging,
    node::{http, socket, PredictionService},
    pricing::{dataset, evaluate_accuracy},
};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load("config/node.toml")?;
    logging::init(&settings.logging);
    settings.validate()?;

    info!("Starting prediction node");

    // The node never serves without its reference dataset
    let source = dataset::source_from_config(&settings.node.dataset)?;
    let rows = dataset::load(source.as_ref()).await?;

    let mae = evaluate_accuracy(&rows);
    info!(
        rows = rows.len(),
        mae = %format!("{:.2}", mae),
        "Model mean absolute error"
    );

    let service = Arc::new(PredictionService::new());

    if let Some(port) = settings.node.socket_port {
        let addr = format!("{}:{}", settings.server.host, port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        let service = service.clone();
        tokio::spawn(async move {
            if let Err(e) = socket::serve(listener, service).await {
                error!(error = %e, "Socket listener stopped");
            }
        });
    }

    let app = http::create_router(service, &settings.node.index_path);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    info!("Node listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
