//! # Structured Logging Module
//!
//! Environment-aware structured logging that writes human-readable output to
//! the console and JSON records to a per-process file under `log/`.

use chrono::Utc;
use std::path::PathBuf;
use std::process;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::detect_environment;

static LOGGER_GUARD: OnceLock<Option<WorkerGuard>> = OnceLock::new();

/// Initialize structured logging with environment-specific configuration
pub fn init_structured_logging() {
    LOGGER_GUARD.get_or_init(|| {
        let environment = detect_environment();
        let log_level = get_log_level(&environment);

        let log_dir = PathBuf::from("log");
        let file_layer = match std::fs::create_dir_all(&log_dir) {
            Ok(()) => {
                let pid = process::id();
                let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
                let file_name = format!("{environment}.{pid}.{timestamp}.log");
                let appender = tracing_appender::rolling::never(&log_dir, file_name);
                Some(tracing_appender::non_blocking(appender))
            }
            Err(_) => None,
        };

        let console = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_level(true)
            .with_filter(build_filter(&log_level));

        let (file, guard) = match file_layer {
            Some((writer, guard)) => {
                let layer = fmt::layer()
                    .with_writer(writer)
                    .with_target(true)
                    .with_ansi(false)
                    .json()
                    .with_filter(build_filter(&log_level));
                (Some(layer), Some(guard))
            }
            None => (None, None),
        };

        // Another subscriber may already be installed (tests, embedding hosts)
        if tracing_subscriber::registry()
            .with(console)
            .with(file)
            .try_init()
            .is_err()
        {
            tracing::debug!("Global tracing subscriber already initialized");
        }

        tracing::info!(
            pid = process::id(),
            environment = %environment,
            file_logging = guard.is_some(),
            "Structured logging initialized"
        );

        guard
    });
}

fn build_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Get log level based on environment
fn get_log_level(environment: &str) -> String {
    match environment {
        "production" => "info".to_string(),
        _ => "debug".to_string(),
    }
}

/// Log structured data for a step operation
pub fn log_step_operation(
    operation: &str,
    step_number: u32,
    dataset_id: Option<i64>,
    queue_id: Option<i64>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        step_number = step_number,
        dataset_id = dataset_id,
        queue_id = queue_id,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "STEP_OPERATION"
    );
}

/// Log structured data for a workflow-wide operation
pub fn log_workflow_operation(
    operation: &str,
    project_id: Option<i64>,
    dataset_id: Option<i64>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        project_id = project_id,
        dataset_id = dataset_id,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "WORKFLOW_OPERATION"
    );
}

/// Log a platform REST call with its outcome and latency
pub fn log_platform_call(method: &str, status: Option<u16>, duration_ms: u64, success: bool) {
    if success {
        tracing::debug!(
            method = %method,
            status = status,
            duration_ms = duration_ms,
            "PLATFORM_CALL"
        );
    } else {
        tracing::warn!(
            method = %method,
            status = status,
            duration_ms = duration_ms,
            "PLATFORM_CALL_FAILED"
        );
    }
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
