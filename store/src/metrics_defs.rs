//! Metrics definitions for the resilient store.

use shared::metrics_defs::{MetricDef, MetricType};

pub const PRIMARY_UNREACHABLE: MetricDef = MetricDef {
    name: "store.primary.unreachable",
    metric_type: MetricType::Counter,
    description: "Number of operations that found the primary backend unreachable",
};

pub const FALLBACK_READ: MetricDef = MetricDef {
    name: "store.fallback.read",
    metric_type: MetricType::Counter,
    description: "Number of reads served from the local fallback map",
};

pub const FALLBACK_MISS: MetricDef = MetricDef {
    name: "store.fallback.miss",
    metric_type: MetricType::Counter,
    description: "Number of fallback reads that found no entry",
};

pub const FALLBACK_WRITE: MetricDef = MetricDef {
    name: "store.fallback.write",
    metric_type: MetricType::Counter,
    description: "Number of writes redirected to the local fallback map",
};

pub const ALL_METRICS: &[MetricDef] = &[
    PRIMARY_UNREACHABLE,
    FALLBACK_READ,
    FALLBACK_MISS,
    FALLBACK_WRITE,
];
