//! Logging and distributed tracing setup.
//!
//! Logs go to stdout (JSON unless debug). When a tracing endpoint is
//! configured, spans are also exported over OTLP/gRPC, which Jaeger
//! ingests natively. Incoming W3C `traceparent` headers on both transports
//! become the parent of the request span.

use crate::error::TokenError;
use axum::http::{HeaderMap, Request};
use once_cell::sync::Lazy;
use opentelemetry::propagation::{Extractor, TextMapPropagator};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::TracerProvider;
use opentelemetry_sdk::{runtime, Resource};
use tracing::{info_span, warn, Span};
use tracing_opentelemetry::OpenTelemetrySpanExt;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const SERVICE_NAME: &str = "jwts";

static PROPAGATOR: Lazy<TraceContextPropagator> = Lazy::new(TraceContextPropagator::new);

/// Keeps the span exporter alive; flushes pending spans on shutdown.
#[derive(Default)]
pub struct TracingGuard {
    provider: Option<TracerProvider>,
}

impl TracingGuard {
    pub fn shutdown(self) {
        if let Some(provider) = self.provider {
            if let Err(e) = provider.shutdown() {
                warn!(error = %e, "Failed to flush spans");
            }
        }
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over
/// `log_level`.
///
/// # Errors
///
/// Returns `Config` if the span exporter cannot be built.
pub fn init_tracing(
    log_level: &str,
    debug: bool,
    tracing_endpoint: Option<&str>,
) -> Result<TracingGuard, TokenError> {
    let provider = tracing_endpoint.map(tracer_provider).transpose()?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let otel_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer(SERVICE_NAME)));
    let text_layer = debug.then(tracing_subscriber::fmt::layer);
    let json_layer = (!debug).then(|| tracing_subscriber::fmt::layer().json());

    tracing_subscriber::registry()
        .with(filter)
        .with(otel_layer)
        .with(text_layer)
        .with(json_layer)
        .init();

    if let Some(endpoint) = tracing_endpoint {
        tracing::info!(endpoint, "Tracing enabled");
    }
    Ok(TracingGuard { provider })
}

fn tracer_provider(endpoint: &str) -> Result<TracerProvider, TokenError> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(otlp_endpoint(endpoint))
        .build()
        .map_err(|e| TokenError::config(format!("span exporter: {e}")))?;

    Ok(TracerProvider::builder()
        .with_batch_exporter(exporter, runtime::Tokio)
        .with_resource(Resource::new(vec![
            KeyValue::new("service.name", SERVICE_NAME),
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
        ]))
        .build())
}

/// `JAEGER_ADDRESS` is usually a bare `host:port`.
fn otlp_endpoint(address: &str) -> String {
    let address = address.trim();
    if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{address}")
    }
}

/// Remote parent carried in the request headers, if any.
pub fn trace_context(headers: &HeaderMap) -> opentelemetry::Context {
    PROPAGATOR.extract(&HeaderExtractor(headers))
}

/// Span for one incoming request, parented to the caller's trace.
pub fn request_span<B>(transport: &'static str, request: &Request<B>) -> Span {
    let span = info_span!(
        "request",
        transport,
        method = %request.method(),
        path = %request.uri().path(),
    );
    span.set_parent(trace_context(request.headers()));
    span
}

struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|value| value.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|name| name.as_str()).collect()
    }
}
