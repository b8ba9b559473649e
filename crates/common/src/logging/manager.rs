//! Logging initialization and shutdown.

use std::sync::OnceLock;

use opentelemetry::{
    global::{self, set_text_map_propagator},
    trace::{TraceError, TracerProvider},
};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    propagation::TraceContextPropagator,
    runtime::Tokio,
    trace::{Config, TracerProvider as SdkTracerProvider},
};
use thiserror::Error;
use tracing::{debug, error, info};
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::{
    filter::{Directive, ParseError},
    fmt::layer,
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter, Layer,
};

use super::types::LoggerConfig;

/// Tracer provider kept around so [`finalize`] can flush it.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid default filter directive: {0}")]
    InvalidDirective(#[from] ParseError),

    #[error("failed to build otlp pipeline: {0}")]
    Otlp(#[from] TraceError),

    #[error("global subscriber already installed: {0}")]
    AlreadyInitialized(#[from] TryInitError),
}

fn env_filter(default_directive: &Directive) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default_directive.clone())
        .from_env_lossy()
}

/// Installs the global `tracing` subscriber described by `config`.
///
/// Must be called from within a tokio runtime when OTLP export is configured.
pub fn init(config: LoggerConfig) -> Result<(), LoggingError> {
    set_text_map_propagator(TraceContextPropagator::new());

    let directive: Directive = config.default_directive.parse()?;

    let stdout_layer = if config.stdout.json_format {
        layer()
            .json()
            .with_span_events(config.stdout.fmt_span.clone())
            .with_filter(env_filter(&directive))
            .boxed()
    } else {
        layer()
            .compact()
            .with_span_events(config.stdout.fmt_span.clone())
            .with_filter(env_filter(&directive))
            .boxed()
    };

    let file_layer = config.file.as_ref().map(|file| {
        let appender =
            RollingFileAppender::new(file.rotation.clone(), &file.directory, &file.file_name_prefix);
        if file.json_format {
            layer()
                .json()
                .with_writer(appender)
                .with_ansi(false)
                .with_filter(env_filter(&directive))
                .boxed()
        } else {
            layer()
                .compact()
                .with_writer(appender)
                .with_ansi(false)
                .with_filter(env_filter(&directive))
                .boxed()
        }
    });

    let otel_layer = match &config.otlp {
        Some(otlp) => {
            let exporter = opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(&otlp.endpoint)
                .with_timeout(otlp.timeout);

            let provider = opentelemetry_otlp::new_pipeline()
                .tracing()
                .with_exporter(exporter)
                .with_trace_config(Config::default().with_resource(config.build_resource()))
                .install_batch(Tokio)?;

            if TRACER_PROVIDER.set(provider.clone()).is_err() {
                error!("tracer provider was already set");
            }

            let tracer = provider.tracer("interop-tracer");
            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(file_layer)
        .with(otel_layer)
        .try_init()?;

    info!(
        service_name = %config.service_name,
        service_version = ?config.service_version,
        otlp = config.otlp.is_some(),
        file_logging = config.file.is_some(),
        "logging initialized"
    );

    Ok(())
}

/// Flushes pending spans and tears down the tracer provider, if any.
pub fn finalize() {
    info!("shutting down logging");

    match TRACER_PROVIDER.get() {
        Some(provider) => {
            if let Err(err) = provider.shutdown() {
                error!(%err, "failed to shut down tracer provider");
            }
        }
        None => debug!("no tracer provider to shut down"),
    }

    global::shutdown_tracer_provider();
}
