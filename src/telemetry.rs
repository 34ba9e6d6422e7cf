//! Telemetry metric name constants.
//!
//! Centralised metric names for huginn operations. Consumers install their
//! own `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `huginn_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `status` — outcome: "ok" or "error"
//! - `source` — where a cached value came from: "memory" or "persisted"

/// Total network attempts issued by controllers (initial + retries).
///
/// Labels: `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "huginn_requests_total";

/// Duration of a single network attempt in seconds.
pub const REQUEST_DURATION_SECONDS: &str = "huginn_request_duration_seconds";

/// Total retry attempts (not counting the initial request).
pub const RETRIES_TOTAL: &str = "huginn_retries_total";

/// Total requests or backoff waits cut short by cancellation.
pub const ABORTS_TOTAL: &str = "huginn_aborts_total";

/// Total cache hits.
///
/// Labels: `source` ("memory" | "persisted").
pub const CACHE_HITS_TOTAL: &str = "huginn_cache_hits_total";

/// Total cache misses.
pub const CACHE_MISSES_TOTAL: &str = "huginn_cache_misses_total";

/// Total persistence read/write failures that were swallowed.
///
/// Labels: `operation` ("read" | "write" | "remove").
pub const CACHE_ERRORS_TOTAL: &str = "huginn_cache_errors_total";
