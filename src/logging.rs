//! # Structured Logging Module
//!
//! Environment-aware structured logging for the automation loop, manual
//! actions and governance scans.

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(get_log_level(&environment)));

        let json_output = std::env::var("SIPHON_LOG_FORMAT")
            .map(|format| format.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let console_layer = if json_output {
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_ansi(false)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_ansi(true)
                .with_filter(filter)
                .boxed()
        };

        // Use try_init to avoid panic if global subscriber already set
        if tracing_subscriber::registry()
            .with(console_layer)
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized - continuing");
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            json = json_output,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

/// Get current environment from environment variables
fn get_environment() -> String {
    std::env::var("SIPHON_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "test" => "debug".to_string(),
        "development" => "debug".to_string(),
        "production" => "info".to_string(),
        _ => "info".to_string(),
    }
}

/// Log a cached-vs-refreshed metric line
pub fn log_refresh(
    orchestrator: &str,
    metric: &str,
    value: &str,
    cached: bool,
    seconds_remaining: f64,
) {
    if cached {
        tracing::info!(
            orchestrator = %orchestrator,
            metric = %metric,
            value = %value,
            seconds_remaining = seconds_remaining.round(),
            "(cached) {metric} is {value}. Refreshing in {:.0} seconds...",
            seconds_remaining
        );
    } else {
        tracing::info!(
            orchestrator = %orchestrator,
            metric = %metric,
            value = %value,
            seconds_remaining = seconds_remaining.round(),
            "(refreshed) {metric} is {value}"
        );
    }
}

/// Log structured data for mutating actions
pub fn log_action(orchestrator: &str, action: &str, status: &str, details: Option<&str>) {
    tracing::info!(
        orchestrator = %orchestrator,
        action = %action,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "💸 ACTION"
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
        "❌ ERROR"
    );
}
