use std::sync::Once;

use metrics::{Unit, describe_counter};
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
            "matchday_cache_hit_total",
            Unit::Count,
            "Reads answered from a live response-cache entry."
        );
        describe_counter!(
            "matchday_cache_miss_total",
            Unit::Count,
            "Reads that had to call the match service."
        );
        describe_counter!(
            "matchday_cache_stale_total",
            Unit::Count,
            "Reads answered from an expired entry because the match service failed."
        );
        describe_counter!(
            "matchday_cache_default_total",
            Unit::Count,
            "Reads answered with the caller default because nothing usable was cached."
        );
        describe_counter!(
            "matchday_remote_call_total",
            Unit::Count,
            "Match service calls by operation and outcome."
        );
        describe_counter!(
            "matchday_vote_total",
            Unit::Count,
            "Vote writes by final outcome."
        );
        describe_counter!(
            "matchday_vote_degraded_total",
            Unit::Count,
            "Votes accepted only by the local ledger."
        );
    });
}
