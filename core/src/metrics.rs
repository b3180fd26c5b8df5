//! Metrics emitted by descriptor caching and request binding.
//!
//! Metrics go through the `metrics` facade and are no-ops until the application installs a
//! recorder (the web crate ships a Prometheus one).

use metrics::{counter, describe_counter, describe_histogram, histogram};
use std::time::Duration;

/// Descriptor cache hits.
pub const CACHE_HITS: &str = "descriptor_cache_hits_total";
/// Descriptor cache misses.
pub const CACHE_MISSES: &str = "descriptor_cache_misses_total";
/// Descriptors built.
pub const DESCRIPTOR_BUILDS: &str = "descriptor_builds_total";
/// Time spent building descriptors.
pub const DESCRIPTOR_BUILD_DURATION: &str = "descriptor_build_duration_seconds";
/// Requests whose binding produced at least one error.
pub const BIND_FAILURES: &str = "bind_failures_total";

/// Register descriptions for every metric this crate emits.
pub fn describe_metrics() {
    describe_counter!(CACHE_HITS, "Total number of descriptor cache hits");
    describe_counter!(CACHE_MISSES, "Total number of descriptor cache misses");
    describe_counter!(DESCRIPTOR_BUILDS, "Total number of request descriptors built");
    describe_histogram!(
        DESCRIPTOR_BUILD_DURATION,
        "Time taken to build a request descriptor"
    );
    describe_counter!(
        BIND_FAILURES,
        "Total number of requests that failed to bind, by type and stage"
    );
}

/// Recorder for binding metrics.
pub struct BindMetrics;

impl BindMetrics {
    /// Record a cache lookup.
    pub fn record_lookup(hit: bool) {
        if hit {
            counter!(CACHE_HITS).increment(1);
        } else {
            counter!(CACHE_MISSES).increment(1);
        }
    }

    /// Record a descriptor build.
    pub fn record_build(type_name: &'static str, duration: Duration) {
        counter!(DESCRIPTOR_BUILDS, "type" => type_name).increment(1);
        histogram!(DESCRIPTOR_BUILD_DURATION).record(duration.as_secs_f64());
    }

    /// Record a failed bind.
    pub fn record_failure(type_name: &'static str, stage: &'static str) {
        counter!(BIND_FAILURES, "type" => type_name, "stage" => stage).increment(1);
    }
}
