//! Process-wide Prometheus counters, exposed on `/metrics`

use lazy_static::lazy_static;
use prometheus::{register_int_counter_vec, IntCounterVec};

lazy_static! {
    static ref STREAM_REQUESTS: IntCounterVec = register_int_counter_vec!(
        "stream_requests_total",
        "Stream requests by outcome",
        &["outcome"]
    )
    .unwrap();

    static ref EXTRACTOR_HITS: IntCounterVec = register_int_counter_vec!(
        "extractor_hits_total",
        "Playable sources found, by extraction strategy",
        &["strategy"]
    )
    .unwrap();
}

/// Outcome label of one stream request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// At least one variant produced
    Streams,
    /// Pipeline finished without variants
    Empty,
    Failed,
    InvalidId,
}

impl RequestOutcome {
    fn label(self) -> &'static str {
        match self {
            Self::Streams => "streams",
            Self::Empty => "empty",
            Self::Failed => "failed",
            Self::InvalidId => "invalid_id",
        }
    }
}

pub fn record_request(outcome: RequestOutcome) {
    STREAM_REQUESTS.with_label_values(&[outcome.label()]).inc();
}

pub fn record_extractor_hit(strategy: &str) {
    EXTRACTOR_HITS.with_label_values(&[strategy]).inc();
}
