use std::sync::Once;
use std::time::Instant;

use metrics::{Unit, describe_counter, describe_histogram, histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

const METRIC_ORIGIN_REQUEST_MS: &str = "kvedge_origin_request_ms";

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

/// Record the latency of one origin call.
pub fn record_origin_latency(backend: &'static str, op: &'static str, started: Instant) {
    histogram!(METRIC_ORIGIN_REQUEST_MS, "backend" => backend, "op" => op)
        .record(started.elapsed().as_secs_f64() * 1000.0);
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "kvedge_cache_hit_total",
            Unit::Count,
            "Total number of cache reads answered from the store."
        );
        describe_counter!(
            "kvedge_cache_miss_total",
            Unit::Count,
            "Total number of cache reads that fell through to the origin."
        );
        describe_counter!(
            "kvedge_cache_decode_error_total",
            Unit::Count,
            "Total number of cache entries bypassed because they failed to decode."
        );
        describe_counter!(
            "kvedge_cache_write_total",
            Unit::Count,
            "Total number of cache entries written."
        );
        describe_counter!(
            "kvedge_cache_delete_total",
            Unit::Count,
            "Total number of cache entries deleted."
        );
        describe_counter!(
            "kvedge_revalidate_events_total",
            Unit::Count,
            "Total number of change events received, by kind."
        );
        describe_counter!(
            "kvedge_revalidate_failures_total",
            Unit::Count,
            "Total number of cache resynchronisation steps that failed."
        );
        describe_histogram!(
            METRIC_ORIGIN_REQUEST_MS,
            Unit::Milliseconds,
            "Origin store request latency in milliseconds."
        );
    });
}
