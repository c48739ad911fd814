use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Lazily builds the process-wide metrics registry and returns it.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Token metrics
    pub token_refreshes: IntCounterVec,
    pub token_refresh_failures: IntCounterVec,
    pub token_refresh_duration: HistogramVec,

    // API metrics
    pub api_requests: IntCounterVec,
    pub api_failures: IntCounterVec,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("wxwork".into()), None).unwrap();

        let metrics = Arc::new(Self {
            token_refreshes: IntCounterVec::new(
                Opts::new("token_refreshes_total", "Upstream token fetches by source"),
                &["source"],
            )
            .unwrap(),
            token_refresh_failures: IntCounterVec::new(
                Opts::new("token_refresh_failures_total", "Failed upstream token fetches by source"),
                &["source"],
            )
            .unwrap(),
            token_refresh_duration: HistogramVec::new(
                HistogramOpts::new("token_refresh_duration_seconds", "Upstream token fetch duration seconds")
                    .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
                &["source"],
            )
            .unwrap(),

            api_requests: IntCounterVec::new(
                Opts::new("api_requests_total", "API calls by endpoint"),
                &["endpoint"],
            )
            .unwrap(),
            api_failures: IntCounterVec::new(
                Opts::new("api_failures_total", "Failed API calls by endpoint and kind"),
                &["endpoint", "kind"],
            )
            .unwrap(),

            registry,
        });

        let reg = &metrics.registry;
        reg.register(Box::new(metrics.token_refreshes.clone())).unwrap();
        reg.register(Box::new(metrics.token_refresh_failures.clone())).unwrap();
        reg.register(Box::new(metrics.token_refresh_duration.clone())).unwrap();
        reg.register(Box::new(metrics.api_requests.clone())).unwrap();
        reg.register(Box::new(metrics.api_failures.clone())).unwrap();

        metrics
    }

    /// Prometheus text exposition of every registered metric.
    pub fn render(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(err) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            tracing::error!(error = %err, "failed to encode metrics");
            return String::new();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}
