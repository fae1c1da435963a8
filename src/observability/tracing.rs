use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    trace::{self, RandomIdGenerator, Sampler},
    Resource,
};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("Failed to initialize OpenTelemetry: {0}")]
    OpenTelemetryInit(#[from] opentelemetry::trace::TraceError),
    #[error("Failed to initialize tracing subscriber: {0}")]
    TracingInit(String),
}

/// Structured logging, plus OTLP trace export when an endpoint is configured.
///
/// `RUST_LOG` wins over `log_level` when it is set. With `enable_json_logging`
/// every event is one JSON object per line, which is what CloudWatch expects
/// from a Lambda.
pub fn init_observability(
    service_name: &str,
    service_version: &str,
    otlp_endpoint: Option<&str>,
    log_level: &str,
    enable_json_logging: bool,
) -> Result<(), ObservabilityError> {
    let otel_layer = otlp_endpoint
        .filter(|endpoint| !endpoint.is_empty())
        .map(|endpoint| otlp_tracer(service_name, service_version, endpoint))
        .transpose()?
        .map(OpenTelemetryLayer::new);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "passhelper_rs={level},passhelper_api={level},passhelper_notifier={level},\
             tower_http=info,aws_config=warn,aws_smithy_runtime=warn",
            level = log_level
        ))
    });

    let registry = tracing_subscriber::registry().with(env_filter).with(otel_layer);
    let fmt = tracing_subscriber::fmt::layer().with_target(false);

    let initialized = if enable_json_logging {
        registry
            .with(fmt.json().with_current_span(false).with_span_list(false))
            .try_init()
    } else {
        registry.with(fmt).try_init()
    };
    initialized.map_err(|e| ObservabilityError::TracingInit(e.to_string()))?;

    info!(
        service = service_name,
        version = service_version,
        otlp = otlp_endpoint.is_some(),
        "Logging initialized"
    );
    Ok(())
}

/// Trace ID of the active OpenTelemetry span, if there is one
pub fn get_current_trace_id() -> Option<String> {
    use opentelemetry::trace::TraceContextExt;
    use tracing_opentelemetry::OpenTelemetrySpanExt;

    let context = tracing::Span::current().context();
    let span_context = context.span().span_context().clone();
    span_context
        .is_valid()
        .then(|| span_context.trace_id().to_string())
}

#[doc(hidden)]
#[macro_export]
macro_rules! log_with_trace {
    ($level:ident, $($arg:tt)*) => {
        match $crate::observability::tracing::get_current_trace_id() {
            Some(trace_id) => tracing::$level!(trace_id = %trace_id, $($arg)*),
            None => tracing::$level!($($arg)*),
        }
    };
}

/// `tracing::info!` tagged with the current trace ID
#[macro_export]
macro_rules! info_with_trace {
    ($($arg:tt)*) => { $crate::log_with_trace!(info, $($arg)*) };
}

#[macro_export]
macro_rules! warn_with_trace {
    ($($arg:tt)*) => { $crate::log_with_trace!(warn, $($arg)*) };
}

#[macro_export]
macro_rules! error_with_trace {
    ($($arg:tt)*) => { $crate::log_with_trace!(error, $($arg)*) };
}

fn otlp_tracer(
    service_name: &str,
    service_version: &str,
    endpoint: &str,
) -> Result<opentelemetry_sdk::trace::Tracer, ObservabilityError> {
    info!(endpoint, "Exporting traces over OTLP");

    let resource = Resource::new([
        KeyValue::new("service.name", service_name.to_string()),
        KeyValue::new("service.version", service_version.to_string()),
        KeyValue::new("service.namespace", "passhelper"),
        KeyValue::new("cloud.provider", "aws"),
        KeyValue::new("cloud.platform", "aws_lambda"),
    ]);

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(endpoint),
        )
        .with_trace_config(
            trace::config()
                .with_sampler(Sampler::AlwaysOn)
                .with_id_generator(RandomIdGenerator::default())
                .with_resource(resource),
        )
        // Lambda freezes between invocations, so flush small batches quickly
        .with_batch_config(
            trace::BatchConfig::default()
                .with_max_export_batch_size(128)
                .with_scheduled_delay(Duration::from_millis(200)),
        )
        .install_batch(opentelemetry_sdk::runtime::Tokio)?;

    Ok(tracer)
}

/// Flushes pending spans, giving up after a few seconds
pub async fn shutdown_observability() {
    let flush = tokio::task::spawn_blocking(global::shutdown_tracer_provider);

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, flush).await {
        Ok(Ok(())) => info!("Tracer provider shut down"),
        Ok(Err(e)) => warn!("Tracer provider shutdown panicked: {}", e),
        Err(_) => warn!(
            "Tracer provider shutdown timed out after {:?}",
            SHUTDOWN_TIMEOUT
        ),
    }
}
