use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use opentelemetry::trace::TraceContextExt;
use std::time::Instant;
use tracing::{error, info, warn, Instrument};
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Logs every request to the local server inside a server span named after
/// the matched route
pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();
    let uri = request.uri().to_string();

    let user_agent = request
        .headers()
        .get("user-agent")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched_path| matched_path.as_str().to_string())
        .unwrap_or_else(|| uri.clone());

    let span_name = format!("{} {}", method, endpoint);
    let span = tracing::info_span!(
        target: "passhelper_rs::http",
        "{}", span_name,
        otel.name = %span_name,
        otel.kind = "server",
        http.method = %method,
        http.route = %endpoint,
        http.url = %uri,
        http.user_agent = %user_agent,
        http.status_code = tracing::field::Empty,
        http.response_time_ms = tracing::field::Empty,
    );

    async {
        info!(method = %method, path = %endpoint, "Processing request");

        let response = next.run(request).await;

        let duration_ms = start_time.elapsed().as_millis();
        let status_code = response.status().as_u16();

        let current_span = tracing::Span::current();
        current_span.record("http.status_code", status_code);
        current_span.record("http.response_time_ms", duration_ms);

        let span_context = current_span.context();
        let otel_span = span_context.span();
        if status_code >= 500 {
            otel_span.set_status(opentelemetry::trace::Status::error("HTTP error"));
        } else {
            otel_span.set_status(opentelemetry::trace::Status::Ok);
        }

        match status_code {
            500.. => error!(
                method = %method,
                path = %endpoint,
                status_code,
                duration_ms,
                "Request failed"
            ),
            400..=499 => warn!(
                method = %method,
                path = %endpoint,
                status_code,
                duration_ms,
                "Request rejected"
            ),
            _ => info!(
                method = %method,
                path = %endpoint,
                status_code,
                duration_ms,
                "Request completed"
            ),
        }

        response
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_middleware_passes_response_through() {
        let app = Router::new()
            .route("/health", get(|| async { "up" }))
            .route(
                "/broken",
                get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "down") }),
            )
            .layer(middleware::from_fn(request_logging_middleware));

        let ok = app
            .clone()
            .oneshot(axum::http::Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);

        let broken = app
            .oneshot(axum::http::Request::get("/broken").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(broken.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
