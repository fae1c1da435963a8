pub mod app;
pub mod config;
pub mod handlers;
pub mod lambda;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod services;
pub mod web;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{Config, ConfigError, ParameterStoreConfig};
pub use observability::{init_observability, shutdown_observability};
