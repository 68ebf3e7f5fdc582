use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// Logs go to stderr so that command output on stdout stays machine readable.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

/// Register descriptions for every metric the cache emits.
pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "folio_cache_hit_total",
            Unit::Count,
            "Total number of reads served from a fresh cache entry."
        );
        describe_counter!(
            "folio_cache_miss_total",
            Unit::Count,
            "Total number of reads that started a fetch."
        );
        describe_counter!(
            "folio_cache_coalesced_total",
            Unit::Count,
            "Total number of reads that joined an in-flight fetch."
        );
        describe_counter!(
            "folio_cache_evict_total",
            Unit::Count,
            "Total number of cache entries evicted due to capacity."
        );
        describe_counter!(
            "folio_cache_invalidated_total",
            Unit::Count,
            "Total number of cache entries marked stale by mutations."
        );
        describe_histogram!(
            "folio_cache_fetch_ms",
            Unit::Milliseconds,
            "Fetch plus normalization latency in milliseconds."
        );
        describe_histogram!(
            "folio_cache_mutation_ms",
            Unit::Milliseconds,
            "Mutation latency including cache maintenance in milliseconds."
        );
    });
}
