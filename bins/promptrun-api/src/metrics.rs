// Prometheus metrics exposed on GET /metrics

use lazy_static::lazy_static;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::time::Duration;

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref REQUESTS_TOTAL: IntCounterVec = {
        let counter = IntCounterVec::new(
            Opts::new("promptrun_requests_total", "Generate-and-run requests by outcome"),
            &["outcome"],
        )
        .expect("requests_total metric definition is valid");
        REGISTRY
            .register(Box::new(counter.clone()))
            .expect("requests_total registered once");
        counter
    };

    pub static ref UPSTREAM_DURATION: HistogramVec = {
        let histogram = HistogramVec::new(
            HistogramOpts::new(
                "promptrun_upstream_duration_seconds",
                "Latency of calls to the LLM and Judge0 services",
            )
            .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0]),
            &["service"],
        )
        .expect("upstream_duration metric definition is valid");
        REGISTRY
            .register(Box::new(histogram.clone()))
            .expect("upstream_duration registered once");
        histogram
    };
}

/// Register all metrics so they appear before the first request
pub fn init() {
    lazy_static::initialize(&REQUESTS_TOTAL);
    lazy_static::initialize(&UPSTREAM_DURATION);
}

pub fn record_request(outcome: &str) {
    REQUESTS_TOTAL.with_label_values(&[outcome]).inc();
}

pub fn observe_upstream(service: &str, elapsed: Duration) {
    UPSTREAM_DURATION
        .with_label_values(&[service])
        .observe(elapsed.as_secs_f64());
}

/// Text exposition format
pub fn render() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}
