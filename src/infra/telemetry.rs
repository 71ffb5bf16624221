use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
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
            "tempora_rebuild_total",
            Unit::Count,
            "Total number of rebuild passes by result."
        );
        describe_histogram!(
            "tempora_rebuild_ms",
            Unit::Milliseconds,
            "Rebuild pass latency in milliseconds."
        );
        describe_gauge!(
            "tempora_rebuild_queue_depth",
            Unit::Count,
            "Rebuild requests still queued behind the running pass."
        );
        describe_counter!(
            "tempora_lookup_hit_total",
            Unit::Count,
            "Total number of lookups that returned a quote."
        );
        describe_counter!(
            "tempora_lookup_miss_total",
            Unit::Count,
            "Total number of lookups with no quote for the bucket."
        );
    });
}
