use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

pub const TIER_MEMORY: &str = "memory";
pub const TIER_CACHE: &str = "cache";
pub const TIER_ENDPOINT: &str = "endpoint";

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Asynchronously initializes and gets a reference to the static `Metrics`.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

/// Text exposition of everything registered so far.
pub async fn gather_metrics() -> String {
    let metrics = get_metrics().await;
    let mut buffer = Vec::new();
    if let Err(err) = TextEncoder::new().encode(&metrics.registry.gather(), &mut buffer) {
        return format!("# failed to encode metrics: {}", err);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Token metrics
    pub token_resolutions: IntCounterVec,
    pub token_endpoint_failures: IntCounter,
    pub token_fetch_duration: HistogramVec,

    // Service metrics
    pub service_responses: IntCounterVec,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("m2mclient".into()), None).expect("metrics registry");

        let metrics: Arc<Metrics> = Arc::new(Self {
            token_resolutions: IntCounterVec::new(Opts::new("token_resolutions_total", "Tokens resolved by tier"), &["tier"]).expect("metric definition"),
            token_endpoint_failures: IntCounter::new("token_endpoint_failures_total", "Failed token endpoint requests").expect("metric definition"),
            token_fetch_duration: HistogramVec::new(HistogramOpts::new("token_fetch_duration_seconds", "Token resolution duration seconds").buckets(vec![0.001, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]), &["tier"]).expect("metric definition"),

            service_responses: IntCounterVec::new(Opts::new("service_responses_total", "Service responses by status class"), &["status_class"]).expect("metric definition"),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.token_resolutions.clone())).expect("metric registration");
        reg.register(Box::new(metrics.token_endpoint_failures.clone())).expect("metric registration");
        reg.register(Box::new(metrics.token_fetch_duration.clone())).expect("metric registration");
        reg.register(Box::new(metrics.service_responses.clone())).expect("metric registration");

        metrics
    }
}

/// "2xx", "4xx", ... for a status code.
pub fn status_class(status: u16) -> String {
    format!("{}xx", status / 100)
}
