use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use tracing::info;

use passhelper_rs::{app, init_observability, lambda::DynamoDbEvent, Config};

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

    let entrypoint = app::notification_listener_entrypoint(&config)?;
    info!(table = %config.database.passport_table_name, "Reminder listener ready");

    let entrypoint = &entrypoint;
    run(service_fn(move |event: LambdaEvent<DynamoDbEvent>| async move {
        let status = entrypoint.handle_request(event.payload).await?;
        Ok::<_, Error>(status)
    }))
    .await
}
