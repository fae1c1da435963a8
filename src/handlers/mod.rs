//! Local development server that stands in for API Gateway.

pub mod gateway;

pub use gateway::{gateway_router, GatewayState};

use axum::{extract::DefaultBodyLimit, middleware, Router};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::observability::request_logging_middleware;

/// The local server: every route key behind the gateway conversion, with the
/// configured body size limit and request timeout
pub fn create_app(state: GatewayState, route_keys: &[&'static str], server: &ServerConfig) -> Router {
    gateway_router(state, route_keys)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(server.max_request_size))
        .layer(TimeoutLayer::new(server.request_timeout()))
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
}
