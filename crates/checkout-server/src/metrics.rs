use prometheus::{
    register_histogram_vec, register_int_counter_vec, Encoder, HistogramVec, IntCounterVec,
    TextEncoder,
};
use std::sync::LazyLock;

pub static INTENT_REQUESTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "checkout_intent_requests_total",
        "Payment intent create/update requests",
        &["op", "result"]
    )
    .unwrap()
});

pub static GATEWAY_LATENCY: LazyLock<HistogramVec> = LazyLock::new(|| {
    register_histogram_vec!(
        "checkout_gateway_call_duration_seconds",
        "Gateway call latency in seconds",
        &["op"],
        vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap()
});

pub static WEBHOOK_EVENTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "checkout_webhook_events_total",
        "Verified webhook events by type",
        &["type"]
    )
    .unwrap()
});

pub static WEBHOOK_REJECTIONS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "checkout_webhook_rejections_total",
        "Webhook deliveries rejected before processing",
        &["reason"]
    )
    .unwrap()
});

pub static TRANSFERS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    register_int_counter_vec!(
        "checkout_donation_transfers_total",
        "Donation transfer attempts",
        &["result"]
    )
    .unwrap()
});

pub fn metrics_output() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
