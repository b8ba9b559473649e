//! Logging subsystem built on `tracing`, with optional file and OpenTelemetry output.

pub mod manager;
pub mod types;


pub use manager::{finalize, init, LoggingError};
pub use tracing_appender::rolling::Rotation;
pub use types::{FileLoggingConfig, LoggerConfig, LoggingConfig, OtlpExportConfig, StdoutConfig};

/// Formats a service name with an optional label suffix.
pub fn format_service_name(base: &str, label: Option<&str>) -> String {
    match label {
        Some(label) => format!("{base}%{label}"),
        None => base.to_owned(),
    }
}
