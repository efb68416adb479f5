use lazy_static::lazy_static;
use prometheus::{
    Counter, CounterVec, Histogram, register_counter, register_counter_vec, register_histogram,
};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter = register_counter!(
        "gatekeeper_requests_total",
        "Total number of proxied path requests"
    )
    .unwrap();
    pub static ref UNTRACKED_TOTAL: Counter = register_counter!(
        "gatekeeper_untracked_total",
        "Requests without a client identity"
    )
    .unwrap();
    pub static ref ALLOWED_TOTAL: Counter = register_counter!(
        "gatekeeper_allowed_total",
        "Tracked requests forwarded to origin"
    )
    .unwrap();
    pub static ref BLOCKED_TOTAL: Counter =
        register_counter!("gatekeeper_blocked_total", "Requests denied over the limit").unwrap();
    pub static ref UNBLOCKS_TOTAL: CounterVec = register_counter_vec!(
        "gatekeeper_unblocks_total",
        "Counters reset, by source",
        &["source"]
    )
    .unwrap();
    pub static ref ORIGIN_LATENCY: Histogram = register_histogram!(
        "gatekeeper_origin_latency_seconds",
        "Origin round trip latency in seconds"
    )
    .unwrap();
}
