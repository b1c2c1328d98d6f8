use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::application::moderation::METRIC_CLEANUP_FAILURE_TOTAL;
use crate::application::selection::METRIC_RANDOM_SAMPLE_ATTEMPTS;
use crate::cache::metric_names::{
    METRIC_CACHE_CONSUME_MS, METRIC_CACHE_EVENT_QUEUE_LEN, METRIC_CACHE_EVICT_TOTAL,
    METRIC_CACHE_FLUSH_TOTAL, METRIC_CACHE_HIT_TOTAL, METRIC_CACHE_MISS_TOTAL,
};
use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
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

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_CACHE_HIT_TOTAL,
            Unit::Count,
            "Total number of derived cache hits."
        );
        describe_counter!(
            METRIC_CACHE_MISS_TOTAL,
            Unit::Count,
            "Total number of derived cache misses, including undecodable entries."
        );
        describe_counter!(
            METRIC_CACHE_EVICT_TOTAL,
            Unit::Count,
            "Total number of derived cache evictions due to capacity."
        );
        describe_counter!(
            METRIC_CACHE_FLUSH_TOTAL,
            Unit::Count,
            "Total number of whole-cache flushes triggered by mutations."
        );
        describe_gauge!(
            METRIC_CACHE_EVENT_QUEUE_LEN,
            Unit::Count,
            "Current number of pending cache events in the queue."
        );
        describe_histogram!(
            METRIC_CACHE_CONSUME_MS,
            Unit::Milliseconds,
            "Cache event consumption latency in milliseconds."
        );
        describe_histogram!(
            METRIC_RANDOM_SAMPLE_ATTEMPTS,
            Unit::Count,
            "Rejection-sampling draws needed per random plaque pick."
        );
        describe_counter!(
            METRIC_CLEANUP_FAILURE_TOTAL,
            Unit::Count,
            "Collaborator follow-ups that failed after a committed write."
        );
    });
}
