//! # Structured Logging Module
//!
//! `tracing` subscriber setup plus helpers that keep lifecycle and
//! assignment records uniform across the crate.

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, LoggingConfig};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging. Only the first call has any effect.
///
/// `RUST_LOG`, when set, takes precedence over the configured level.
pub fn init_structured_logging(config: &LoggingConfig) {
    LOGGER_INITIALIZED.get_or_init(|| {
        let filter = build_filter(&config.level);

        let result = match config.format {
            LogFormat::Pretty => tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_level(true),
                )
                .try_init(),
            LogFormat::Json => tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_thread_ids(true)
                        .with_level(true),
                )
                .try_init(),
        };

        // A global subscriber may already be installed by the host application
        if result.is_err() {
            tracing::debug!("Global tracing subscriber already initialized");
        }

        tracing::info!(
            level = %config.level,
            format = ?config.format,
            "Structured logging initialized"
        );
    });
}

fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Log structured data for service request operations
pub fn log_request_operation(
    operation: &str,
    service_request_id: Option<i64>,
    actor_id: Option<i64>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        service_request_id = service_request_id,
        actor_id = actor_id,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "REQUEST_OPERATION"
    );
}

/// Log structured data for assignment ranking
pub fn log_assignment_operation(
    operation: &str,
    service_request_id: Option<i64>,
    category_id: Option<i64>,
    candidate_count: usize,
    top_candidate: Option<i64>,
) {
    tracing::info!(
        operation = %operation,
        service_request_id = service_request_id,
        category_id = category_id,
        candidate_count = candidate_count,
        top_candidate = top_candidate,
        timestamp = %Utc::now().to_rfc3339(),
        "ASSIGNMENT_OPERATION"
    );
}

/// Log error with full context
pub fn log_error(component: &str, operation: &str, error: &str, context: Option<&str>) {
    tracing::error!(
        component = %component,
        operation = %operation,
        error = %error,
        context = context,
        timestamp = %Utc::now().to_rfc3339(),
        "ERROR"
    );
}
