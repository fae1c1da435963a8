use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use tracing::info;

use passhelper_rs::{app, init_observability, lambda::ApiGatewayV2httpRequest, Config};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = Config::from_environment().await?;

    init_observability(
        &config.observability.service_name,
        &config.observability.service_version,
        config.observability.otlp_endpoint.as_deref(),
        &config.observability.log_level,
        config.observability.enable_json_logging,
    )?;

    let entrypoint = app::api_gateway_entrypoint(&config).await?;
    info!(domain = %config.server.domain_name, "Website handler ready");

    let entrypoint = &entrypoint;
    run(service_fn(move |event: LambdaEvent<ApiGatewayV2httpRequest>| async move {
        Ok::<_, Error>(entrypoint.handle_request(event.payload).await)
    }))
    .await
}
