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
            "quaderno_cache_hit_total",
            Unit::Count,
            "Reads answered from the cache store."
        );
        describe_counter!(
            "quaderno_cache_miss_total",
            Unit::Count,
            "Reads that had to populate from origin."
        );
        describe_counter!(
            "quaderno_cache_corrupt_total",
            Unit::Count,
            "Cached payloads that failed to decode."
        );
        describe_counter!(
            "quaderno_cache_revalidate_total",
            Unit::Count,
            "Background revalidations started."
        );
        describe_counter!(
            "quaderno_cache_revalidate_failed_total",
            Unit::Count,
            "Background revalidations that kept the stale entry after an error."
        );
        describe_counter!(
            "quaderno_asset_relocation_failed_total",
            Unit::Count,
            "Image records cached with their origin url after relocation failed."
        );
        describe_histogram!(
            "quaderno_origin_fetch_ms",
            Unit::Milliseconds,
            "Origin API latency in milliseconds, pagination included, image relocation excluded."
        );
    });
}
