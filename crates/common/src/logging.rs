//! Logging setup: a compact stdout layer plus optional OTLP span export.
use std::env;

use opentelemetry::{trace::TracerProvider, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{trace::SdkTracerProvider, Resource};
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// OTLP collector endpoint. Spans are only exported when set.
pub const OTLP_URL_ENVVAR: &str = "STAKER_OTLP_URL";

/// Label telling apart several bots run from the same binary, e.g. one per wallet.
pub const INSTANCE_ENVVAR: &str = "STAKER_SVC_LABEL";

/// Set to `1` to print source file names.
pub const LOG_FILE_ENVVAR: &str = "LOG_FILE";

/// Set to `1` to print source line numbers.
pub const LOG_LINE_NUM_ENVVAR: &str = "LOG_LINE_NUM";

/// How the process logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    service: String,
    instance: Option<String>,
    otlp_url: Option<String>,
    log_file: bool,
    log_line_num: bool,
}

impl LoggerConfig {
    /// Stdout-only logging for `service`.
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            instance: None,
            otlp_url: None,
            log_file: false,
            log_line_num: false,
        }
    }

    /// Reads the optional settings from the `STAKER_*` and `LOG_*` environment variables.
    pub fn from_env(service: impl Into<String>) -> Self {
        let flag = |name: &str| env::var(name).is_ok_and(|v| v == "1");

        let mut config = Self::new(service)
            .with_source_location(flag(LOG_FILE_ENVVAR), flag(LOG_LINE_NUM_ENVVAR));
        if let Ok(instance) = env::var(INSTANCE_ENVVAR) {
            config = config.with_instance(instance);
        }
        if let Ok(url) = env::var(OTLP_URL_ENVVAR) {
            config = config.with_otlp_url(url);
        }

        config
    }

    /// Sets the instance label.
    pub fn with_instance(self, instance: impl Into<String>) -> Self {
        Self {
            instance: Some(instance.into()),
            ..self
        }
    }

    /// Exports spans to the OTLP collector at `url`.
    pub fn with_otlp_url(self, url: impl Into<String>) -> Self {
        Self {
            otlp_url: Some(url.into()),
            ..self
        }
    }

    /// Prints the source file and/or line of each event.
    pub fn with_source_location(self, file: bool, line: bool) -> Self {
        Self {
            log_file: file,
            log_line_num: line,
            ..self
        }
    }

    /// The service name reported to the collector.
    pub fn service(&self) -> &str {
        &self.service
    }

    /// `service%instance`, or just the service name when no instance label is set.
    pub fn display_name(&self) -> String {
        match &self.instance {
            Some(instance) => format!("{}%{instance}", self.service),
            None => self.service.clone(),
        }
    }

    /// The OTLP collector endpoint, if any.
    pub fn otlp_url(&self) -> Option<&str> {
        self.otlp_url.as_deref()
    }
}

/// Installs the global subscriber.
///
/// `RUST_LOG` filters stdout output and defaults to `info`. A second call is a no-op, and an
/// exporter that cannot be built leaves stdout logging in place.
pub fn init(config: LoggerConfig) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let stdout = tracing_subscriber::fmt::layer()
        .compact()
        .with_file(config.log_file)
        .with_line_number(config.log_line_num)
        .with_filter(filter);

    let otlp =
        otlp_tracer(&config).map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));
    let exporting = otlp.is_some();

    if tracing_subscriber::registry()
        .with(stdout)
        .with(otlp)
        .try_init()
        .is_ok()
    {
        info!(name = %config.display_name(), exporting, "logging started");
    }
}

fn otlp_tracer(config: &LoggerConfig) -> Option<<SdkTracerProvider as TracerProvider>::Tracer> {
    let url = config.otlp_url()?;

    let exporter = match opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(url)
        .build()
    {
        Ok(exporter) => exporter,
        Err(e) => {
            // no subscriber yet
            eprintln!("otlp exporter for {url} unavailable, logging to stdout only: {e}");
            return None;
        }
    };

    let mut resource = Resource::builder().with_service_name(config.service().to_owned());
    if let Some(instance) = &config.instance {
        resource = resource.with_attribute(KeyValue::new("service.instance.id", instance.clone()));
    }

    let provider = SdkTracerProvider::builder()
        .with_resource(resource.build())
        .with_batch_exporter(exporter)
        .build();

    Some(provider.tracer(config.service().to_owned()))
}
