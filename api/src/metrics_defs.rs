use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUESTS: MetricDef = MetricDef {
    name: "api.requests",
    metric_type: MetricType::Counter,
    description: "Number of handled requests. Tagged with code.",
};

pub const REQUEST_DURATION: MetricDef = MetricDef {
    name: "api.request.duration",
    metric_type: MetricType::Histogram,
    description: "Request duration in seconds",
};

pub const ALL_METRICS: &[MetricDef] = &[REQUESTS, REQUEST_DURATION];
