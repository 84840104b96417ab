//! Prometheus metrics for the JWT service.
//!
//! Collectors live in a service-owned registry whose exported names carry
//! the configured namespace as a prefix (`example_com_jwts_requests_total`).

use once_cell::sync::{Lazy, OnceCell};
use prometheus::core::Collector;
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use tracing::warn;

static NAMESPACE: OnceCell<String> = OnceCell::new();

static REGISTRY: Lazy<Registry> = Lazy::new(|| registry(NAMESPACE.get().map(String::as_str)));

/// Tokens issued counter.
pub static TOKENS_ISSUED: Lazy<CounterVec> = Lazy::new(|| {
    CounterVec::new(
        Opts::new("jwts_tokens_issued_total", "Total number of tokens issued"),
        &["algorithm"],
    )
    .expect("Failed to create tokens_issued metric")
});

/// Token validations by outcome.
pub static TOKEN_VALIDATIONS: Lazy<CounterVec> = Lazy::new(|| {
    CounterVec::new(
        Opts::new("jwts_token_validations_total", "Total number of token validations"),
        &["outcome"],
    )
    .expect("Failed to create token_validations metric")
});

/// Requests by transport, method and status.
pub static REQUESTS: Lazy<CounterVec> = Lazy::new(|| {
    CounterVec::new(
        Opts::new("jwts_requests_total", "Total number of handled requests"),
        &["transport", "method", "status"],
    )
    .expect("Failed to create requests metric")
});

/// Request latency histogram.
pub static REQUEST_LATENCY: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("jwts_request_latency_seconds", "Request latency in seconds")
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        &["transport", "method"],
    )
    .expect("Failed to create request_latency metric")
});

/// Set the namespace used to prefix metric names.
///
/// Must run before the first scrape; later calls are ignored.
pub fn init(namespace: &str) {
    if NAMESPACE.set(namespace.to_string()).is_err() {
        warn!(namespace, "Metrics namespace already set");
    }
}

/// Build a registry holding every service collector under `namespace`.
fn registry(namespace: Option<&str>) -> Registry {
    let prefix = namespace.map(metric_prefix).filter(|p| !p.is_empty());
    let registry = Registry::new_custom(prefix, None).unwrap_or_default();

    let collectors: [Box<dyn Collector>; 4] = [
        Box::new(TOKENS_ISSUED.clone()),
        Box::new(TOKEN_VALIDATIONS.clone()),
        Box::new(REQUESTS.clone()),
        Box::new(REQUEST_LATENCY.clone()),
    ];
    for collector in collectors {
        if let Err(e) = registry.register(collector) {
            warn!(error = %e, "Failed to register metric");
        }
    }
    registry
}

/// Metric names only allow `[a-zA-Z0-9_]`, so `example.com` becomes `example_com`.
fn metric_prefix(namespace: &str) -> String {
    let mut prefix: String = namespace
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if prefix.starts_with(|c: char| c.is_ascii_digit()) {
        prefix.insert(0, '_');
    }
    prefix
}

/// Record a token issuance.
pub fn record_token_issued(algorithm: &str) {
    TOKENS_ISSUED.with_label_values(&[algorithm]).inc();
}

/// Record a validation outcome.
pub fn record_validation(valid: bool) {
    let outcome = if valid { "valid" } else { "invalid" };
    TOKEN_VALIDATIONS.with_label_values(&[outcome]).inc();
}

/// Record a finished request.
pub fn record_request(transport: &str, method: &str, status: &str, duration_secs: f64) {
    REQUESTS
        .with_label_values(&[transport, method, status])
        .inc();
    REQUEST_LATENCY
        .with_label_values(&[transport, method])
        .observe(duration_secs);
}

/// Render the service registry in the text exposition format.
pub fn gather_text() -> String {
    encode(&REGISTRY)
}

fn encode(registry: &Registry) -> String {
    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&registry.gather(), &mut buffer) {
        warn!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8(buffer).unwrap_or_default()
}
