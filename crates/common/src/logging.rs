//! Logging bootstrap for batcher services.
//!
//! Structured `tracing` output through a compact fmt layer, filtered by
//! `RUST_LOG`. Every service passes a whoami string so log lines from
//! co-located validator processes stay attributable.

use std::env;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Environment variable appended to the whoami string when set.
pub const SVC_LABEL_ENVVAR: &str = "CORRIDOR_SVC_LABEL";

/// Logging configuration.
#[derive(Debug)]
pub struct LoggerConfig {
    whoami: String,
}

impl LoggerConfig {
    /// Creates a new instance with whoami set.
    pub fn new(whoami: String) -> Self {
        Self { whoami }
    }

    /// Creates an instance from a base service name plus the env label.
    pub fn with_base_name(base: &str) -> Self {
        Self::new(get_whoami_string(base))
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::with_base_name("(corridor-service)")
    }
}

/// Initializes the logging subsystem with the provided config.
pub fn init(config: LoggerConfig) {
    let filter = tracing_subscriber::EnvFilter::from_default_env();
    let stdout_sub = tracing_subscriber::fmt::layer().compact().with_filter(filter);

    tracing_subscriber::registry().with(stdout_sub).init();

    info!(whoami = %config.whoami, "logging started");
}

/// Gets the service label from the standard envvar, which should be included
/// in the whoami string.
pub fn get_service_label_from_env() -> Option<String> {
    env::var(SVC_LABEL_ENVVAR).ok()
}

/// Computes a standard whoami string.
pub fn get_whoami_string(base: &str) -> String {
    match get_service_label_from_env() {
        Some(label) => format!("{base}%{label}"),
        None => base.to_string(),
    }
}
