pub mod middleware;
pub mod tracing;

pub use middleware::request_logging_middleware;
pub use tracing::{get_current_trace_id, init_observability, shutdown_observability, ObservabilityError};
