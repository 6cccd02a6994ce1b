//! Tracing subscriber setup
//!
//! Log lines go to stderr so stdout only carries prompts and the
//! itinerary. Spans are exported over OTLP/HTTP when an endpoint is
//! configured.

use anyhow::{Context, Result};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::config::LoggingConfig;

const SERVICE_NAME: &str = "travelplan";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Flushes exported spans when dropped
#[must_use = "spans are only flushed when the guard is dropped"]
pub struct TelemetryGuard {
    provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take()
            && let Err(e) = provider.shutdown()
        {
            eprintln!("Failed to flush trace export: {e}");
        }
    }
}

/// Filter directive: `RUST_LOG` wins unless `--verbose` was given
fn filter_directive(level: &str, verbose: bool, rust_log: Option<String>) -> String {
    if verbose {
        return "debug".to_string();
    }
    rust_log
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| level.to_string())
}

/// Install the global subscriber
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<TelemetryGuard> {
    let directive = filter_directive(&config.level, verbose, std::env::var("RUST_LOG").ok());
    let filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("Invalid log filter '{directive}'"))?;

    let mut layers: Vec<BoxedLayer> = Vec::new();
    let fmt = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    layers.push(match config.format.as_str() {
        "json" => fmt.json().boxed(),
        "compact" => fmt.compact().boxed(),
        _ => fmt.pretty().boxed(),
    });

    let provider = match &config.otlp_endpoint {
        Some(endpoint) => {
            let exporter = SpanExporter::builder()
                .with_http()
                .with_endpoint(endpoint.clone())
                .build()
                .context("Failed to build OTLP span exporter")?;
            let provider = SdkTracerProvider::builder()
                .with_batch_exporter(exporter)
                .with_resource(Resource::builder().with_service_name(SERVICE_NAME).build())
                .build();
            layers.push(
                tracing_opentelemetry::layer()
                    .with_tracer(provider.tracer(SERVICE_NAME))
                    .boxed(),
            );
            Some(provider)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::debug!(%directive, format = %config.format, otlp = provider.is_some(), "Logging initialized");
    Ok(TelemetryGuard { provider })
}
