//! Metrics definitions for the combiner.

use shared::metrics_defs::{MetricDef, MetricType};

pub const BUNDLE_CACHE_HIT: MetricDef = MetricDef {
    name: "bundle_cache.hit",
    metric_type: MetricType::Counter,
    description: "Number of bundle lookups served from the cache",
};

pub const BUNDLE_CACHE_MISS: MetricDef = MetricDef {
    name: "bundle_cache.miss",
    metric_type: MetricType::Counter,
    description: "Number of bundle lookups that missed or bypassed the cache",
};

pub const REQUESTS_SERVED: MetricDef = MetricDef {
    name: "requests.served",
    metric_type: MetricType::Counter,
    description: "Bundle requests answered with a 200",
};

pub const REQUESTS_REJECTED: MetricDef = MetricDef {
    name: "requests.rejected",
    metric_type: MetricType::Counter,
    description: "Bundle requests rejected with a 400",
};

pub const REQUESTS_FAILED: MetricDef = MetricDef {
    name: "requests.failed",
    metric_type: MetricType::Counter,
    description: "Bundle requests that failed during resolution or assembly",
};

pub const REMOTE_FETCHES: MetricDef = MetricDef {
    name: "assembler.remote_fetches",
    metric_type: MetricType::Counter,
    description: "Remote asset fetches performed during assembly",
};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "requests.duration",
    metric_type: MetricType::Histogram,
    description: "Seconds spent answering one bundle request",
};

// Registration list consumed at exporter setup.
pub const ALL_METRICS: &[MetricDef] = &[
    BUNDLE_CACHE_HIT,
    BUNDLE_CACHE_MISS,
    REQUESTS_SERVED,
    REQUESTS_REJECTED,
    REQUESTS_FAILED,
    REMOTE_FETCHES,
    REQUEST_DURATION,
];
