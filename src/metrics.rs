use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};

lazy_static! {
    pub static ref ADMISSION_CHECKS_TOTAL: Counter = register_counter!(
        "supervision_admission_checks_total",
        "Requests checked by the rate limiter, admitted or rejected"
    )
    .unwrap();
    pub static ref RATE_LIMITED_TOTAL: Counter = register_counter!(
        "supervision_rate_limited_total",
        "Requests rejected by the rate limiter"
    )
    .unwrap();
    pub static ref LLM_RETRIES_TOTAL: Counter = register_counter!(
        "supervision_llm_retries_total",
        "LLM calls retried after throttling"
    )
    .unwrap();
    pub static ref LLM_LATENCY: Histogram = register_histogram!(
        "supervision_llm_latency_seconds",
        "Transcript analysis latency in seconds, retries included"
    )
    .unwrap();
    pub static ref RATE_LIMIT_ENTRIES: Gauge = register_gauge!(
        "supervision_rate_limit_entries",
        "Client identifiers currently tracked by the rate limiter"
    )
    .unwrap();
}
