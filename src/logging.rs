//! # Structured Logging Module
//!
//! Environment-aware structured logging for kernel operations, work unit
//! lifecycle and retry/skip decisions.

use chrono::Utc;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static LOGGER_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration.
///
/// `RUST_LOG` takes precedence over the environment default. Setting
/// `BATCH_KERNEL_LOG_FORMAT=json` switches the console output to JSON lines.
pub fn init_structured_logging() {
    LOGGER_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(get_log_level(&environment)));
        let json_output = std::env::var("BATCH_KERNEL_LOG_FORMAT")
            .map(|format| format.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        let console_layer = if json_output {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .json()
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(true)
                .with_filter(filter)
                .boxed()
        };

        // A global subscriber may already be installed by the embedding application
        if tracing_subscriber::registry()
            .with(console_layer)
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized - continuing with existing subscriber");
        }

        tracing::info!(
            pid = std::process::id(),
            environment = %environment,
            json_output = json_output,
            "🔧 STRUCTURED LOGGING: Initialized"
        );
    });
}

fn get_environment() -> String {
    std::env::var("BATCH_KERNEL_ENV")
        .or_else(|_| std::env::var("APP_ENV"))
        .unwrap_or_else(|_| "development".to_string())
}

fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log structured data for kernel-level operations (start, restart, stop, shutdown)
pub fn log_kernel_operation(
    operation: &str,
    execution_id: Option<i64>,
    job_name: Option<&str>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        execution_id = execution_id,
        job_name = job_name,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📋 KERNEL_OPERATION"
    );
}

/// Log structured data for work unit lifecycle (register, dispatch, deregister)
pub fn log_work_unit_operation(
    operation: &str,
    top_level_execution_id: i64,
    unit_key: &str,
    status: &str,
    details: Option<&str>,
) {
    tracing::debug!(
        operation = %operation,
        top_level_execution_id = top_level_execution_id,
        unit_key = %unit_key,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "🧩 WORK_UNIT_OPERATION"
    );
}

/// Log structured data for retry/skip decisions
pub fn log_policy_decision(
    policy: &str,
    phase: &str,
    error_type: &str,
    absorbed: bool,
    count: u64,
    limit: Option<u64>,
) {
    tracing::debug!(
        policy = %policy,
        phase = %phase,
        error_type = %error_type,
        absorbed = absorbed,
        count = count,
        limit = limit,
        "🔁 POLICY_DECISION"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_by_environment() {
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("development"), "debug");
        assert_eq!(get_log_level("test"), "debug");
    }

    #[test]
    fn test_init_is_idempotent() {
        init_structured_logging();
        init_structured_logging();
        log_policy_decision("retry", "read", "IoError", true, 1, Some(3));
        log_work_unit_operation("register", 7, "7::S::2", "registered", Some("partition"));
    }
}
