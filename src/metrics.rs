use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};


lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("quiz_gateway_requests_total", "Total number of AI requests").unwrap();
    pub static ref RATE_LIMITED: Counter =
        register_counter!("quiz_gateway_rate_limited_total", "Requests rejected by the rate limiter").unwrap();
    pub static ref DEDUP_JOINS: Counter =
        register_counter!("quiz_gateway_dedup_joins_total", "Requests attached to an in-flight generation").unwrap();
    pub static ref UPSTREAM_TIMEOUTS: Counter =
        register_counter!("quiz_gateway_upstream_timeouts_total", "Upstream calls that hit the timeout").unwrap();
    pub static ref UPSTREAM_ERRORS: Counter =
        register_counter!("quiz_gateway_upstream_errors_total", "Upstream calls that failed").unwrap();
    pub static ref UPSTREAM_LATENCY: Histogram = register_histogram!(
        "quiz_gateway_upstream_latency_seconds",
        "Upstream call latency in seconds"
    )
    .unwrap();
    pub static ref TRACKED_CALLERS: Gauge =
        register_gauge!("quiz_gateway_tracked_callers", "Callers currently held by the rate limiter").unwrap();
    pub static ref IN_FLIGHT_GENERATIONS: Gauge =
        register_gauge!("quiz_gateway_in_flight_generations", "Deduplicated generations currently running").unwrap();
}
