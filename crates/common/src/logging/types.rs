//! Configuration types for the logging subsystem.

use std::{path::PathBuf, time::Duration};

use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;
use serde::{Deserialize, Serialize};
use tracing_appender::rolling::Rotation;
use tracing_subscriber::fmt::format::FmtSpan;

use super::format_service_name;

/// Default filter directive used when `RUST_LOG` is unset.
const DEFAULT_DIRECTIVE: &str = "info";

/// Default log file prefix when file logging is enabled without one.
const DEFAULT_LOG_FILE_PREFIX: &str = "interop";

/// Stdout layer settings.
#[derive(Debug, Clone)]
pub struct StdoutConfig {
    /// Emit JSON lines instead of the compact format.
    pub json_format: bool,
    /// Span lifecycle events to log.
    pub fmt_span: FmtSpan,
}

impl Default for StdoutConfig {
    fn default() -> Self {
        Self {
            json_format: false,
            fmt_span: FmtSpan::NONE,
        }
    }
}

/// Rolling file output.
#[derive(Debug, Clone)]
pub struct FileLoggingConfig {
    pub directory: PathBuf,
    pub file_name_prefix: String,
    pub rotation: Rotation,
    pub json_format: bool,
}

impl FileLoggingConfig {
    pub fn new(directory: PathBuf, file_name_prefix: String) -> Self {
        Self {
            directory,
            file_name_prefix,
            rotation: Rotation::DAILY,
            json_format: false,
        }
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_json_format(mut self, json_format: bool) -> Self {
        self.json_format = json_format;
        self
    }
}

/// OTLP exporter settings.
#[derive(Debug, Clone)]
pub struct OtlpExportConfig {
    pub endpoint: String,
    pub timeout: Duration,
}

impl OtlpExportConfig {
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Runtime logger configuration consumed by [`super::init`].
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub service_name: String,
    pub service_version: Option<String>,
    pub service_instance_id: Option<String>,
    /// Filter directive applied when `RUST_LOG` is not set.
    pub default_directive: String,
    pub stdout: StdoutConfig,
    pub file: Option<FileLoggingConfig>,
    pub otlp: Option<OtlpExportConfig>,
}

impl LoggerConfig {
    pub fn new(service_name: String) -> Self {
        Self {
            service_name,
            service_version: None,
            service_instance_id: None,
            default_directive: DEFAULT_DIRECTIVE.to_owned(),
            stdout: StdoutConfig::default(),
            file: None,
            otlp: None,
        }
    }

    pub fn with_service_version(mut self, version: String) -> Self {
        self.service_version = Some(version);
        self
    }

    pub fn with_service_instance_id(mut self, instance_id: String) -> Self {
        self.service_instance_id = Some(instance_id);
        self
    }

    pub fn with_default_directive(mut self, directive: impl Into<String>) -> Self {
        self.default_directive = directive.into();
        self
    }

    pub fn with_json_logging(mut self, enabled: bool) -> Self {
        self.stdout.json_format = enabled;
        self
    }

    pub fn with_fmt_span(mut self, fmt_span: FmtSpan) -> Self {
        self.stdout.fmt_span = fmt_span;
        self
    }

    pub fn with_file_logging(mut self, config: FileLoggingConfig) -> Self {
        self.file = Some(config);
        self
    }

    pub fn with_otlp(mut self, config: OtlpExportConfig) -> Self {
        self.otlp = Some(config);
        self
    }

    /// Builds the OpenTelemetry resource describing this service.
    pub fn build_resource(&self) -> Resource {
        let mut attributes = vec![KeyValue::new("service.name", self.service_name.clone())];
        if let Some(version) = &self.service_version {
            attributes.push(KeyValue::new("service.version", version.clone()));
        }
        if let Some(instance_id) = &self.service_instance_id {
            attributes.push(KeyValue::new("service.instance.id", instance_id.clone()));
        }
        Resource::new(attributes)
    }
}

/// `[logging]` section of a TOML config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Label appended to the service name (e.g. "prod", "dev").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_label: Option<String>,

    /// OTLP collector endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub otlp_url: Option<String>,

    /// Directory for rolling log files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file_prefix: Option<String>,

    #[serde(default)]
    pub json_format: bool,
}

impl LoggingConfig {
    /// Resolves the TOML section into a runtime [`LoggerConfig`] for `service_base_name`.
    pub fn to_logger_config(&self, service_base_name: &str) -> LoggerConfig {
        let service_name = format_service_name(service_base_name, self.service_label.as_deref());
        let mut config = LoggerConfig::new(service_name).with_json_logging(self.json_format);

        if let Some(dir) = &self.log_dir {
            let prefix = self
                .log_file_prefix
                .clone()
                .unwrap_or_else(|| DEFAULT_LOG_FILE_PREFIX.to_owned());
            config = config.with_file_logging(
                FileLoggingConfig::new(dir.clone(), prefix).with_json_format(self.json_format),
            );
        }

        if let Some(url) = &self.otlp_url {
            config = config.with_otlp(OtlpExportConfig::new(url.clone()));
        }

        config
    }
}
