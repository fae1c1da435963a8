use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

use passhelper_rs::{
    app,
    handlers::{create_app, GatewayState},
    init_observability, shutdown_observability, Config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_environment().await?;
    println!("Configuration loaded successfully");

    init_observability(
        &config.observability.service_name,
        &config.observability.service_version,
        config.observability.otlp_endpoint.as_deref(),
        &config.observability.log_level,
        config.observability.enable_json_logging,
    )?;

    info!(
        "Starting {} v{} (local server)",
        config.observability.service_name, config.observability.service_version
    );
    info!("Region: {}", config.aws.region);
    info!("Domain: {}", config.server.domain_name);

    let entrypoint = Arc::new(app::api_gateway_entrypoint(&config).await?);
    let route_keys = entrypoint.route_keys();
    info!("Registered {} routes", route_keys.len());

    let app = create_app(GatewayState { entrypoint }, &route_keys, &config.server);

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install CTRL+C signal handler: {}", e);
        }
        info!("Shutdown signal received");
        shutdown_observability().await;
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shutdown complete");
    Ok(())
}
