use common::config::components::runtime::{LogFormat, LoggingConfig};
use time::macros::format_description;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Install the process-wide subscriber. `RUST_LOG` wins over the configured
/// level. Library crates log through the `log` facade, which the subscriber
/// picks up via `tracing-log`.
pub fn init_logger(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));
    let time_format =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:2]");

    let layer = fmt::layer()
        .with_timer(fmt::time::LocalTime::new(time_format))
        .with_target(false)
        .with_level(true)
        .with_thread_names(false)
        .with_line_number(false)
        .with_file(false);

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.format {
        LogFormat::Compact => registry.with(layer.compact()).try_init(),
        LogFormat::Pretty => registry.with(layer.pretty()).try_init(),
    };
    if let Err(e) = result {
        tracing::warn!("logger already initialised: {e}");
    }
}
