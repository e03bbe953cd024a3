//! Metrics definitions for the activities service.

use shared::metrics_defs::{MetricDef, MetricType};

pub const CACHE_HIT: MetricDef = MetricDef {
    name: "activity_cache.hit",
    metric_type: MetricType::Counter,
    description: "Number of activity requests served from a fresh cache entry",
};

pub const CACHE_MISS: MetricDef = MetricDef {
    name: "activity_cache.miss",
    metric_type: MetricType::Counter,
    description: "Number of activity requests with no entry or an expired one",
};

pub const CACHED_USERS: MetricDef = MetricDef {
    name: "activity_cache.users",
    metric_type: MetricType::Gauge,
    description: "Number of users with a cache entry, fresh or expired",
};

pub const PAGE_FETCH_DURATION: MetricDef = MetricDef {
    name: "upstream.page_fetch.duration",
    metric_type: MetricType::Histogram,
    description: "Time to fetch and decode one page of activities in seconds",
};

pub const PAGE_FETCH_ERRORS: MetricDef = MetricDef {
    name: "upstream.page_fetch.errors",
    metric_type: MetricType::Counter,
    description: "Number of page fetches that failed",
};

pub const FETCH_TRUNCATED: MetricDef = MetricDef {
    name: "upstream.fetch.truncated",
    metric_type: MetricType::Counter,
    description: "Number of fan-outs whose last page was full",
};

pub const FETCH_RECORDS: MetricDef = MetricDef {
    name: "upstream.fetch.records",
    metric_type: MetricType::Histogram,
    description: "Number of records merged from one fan-out",
};

pub const ACTIVITIES_REQUEST_DURATION: MetricDef = MetricDef {
    name: "activities.request.duration",
    metric_type: MetricType::Histogram,
    description: "Time to answer an /activities request in seconds",
};

pub const ALL_METRICS: &[MetricDef] = &[
    CACHE_HIT,
    CACHE_MISS,
    CACHED_USERS,
    PAGE_FETCH_DURATION,
    PAGE_FETCH_ERRORS,
    FETCH_TRUNCATED,
    FETCH_RECORDS,
    ACTIVITIES_REQUEST_DURATION,
];
