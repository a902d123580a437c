// Copyright (c) The live-run Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Logging setup for programs embedding live-run.

use std::sync::Once;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{Layer, filter::Targets, layer::SubscriberExt, util::SubscriberInitExt};

/// The environment variable read by [`init_logging`] for the log filter, e.g. `live_run=debug`.
pub const LOG_ENV: &str = "LIVE_RUN_LOG";

static INIT_LOGGER: Once = Once::new();

/// Installs a global `tracing` subscriber that writes to stderr.
///
/// The filter is read from [`LOG_ENV`] using the `tracing-subscriber` targets syntax; if it's
/// unset or empty, `info` is used. Only the first call has an effect, and nothing is installed if
/// another global subscriber already exists.
pub fn init_logging() {
    INIT_LOGGER.call_once(|| {
        let level_str = std::env::var(LOG_ENV).unwrap_or_default();
        let (targets, parse_error) = parse_targets(&level_str);

        let layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_filter(targets);

        if tracing_subscriber::registry().with(layer).try_init().is_ok() {
            if let Some(err) = parse_error {
                tracing::warn!("invalid {LOG_ENV} value `{level_str}`, using info: {err}");
            }
        }
    });
}

fn parse_targets(level_str: &str) -> (Targets, Option<String>) {
    let default = Targets::new().with_default(LevelFilter::INFO);
    if level_str.is_empty() {
        return (default, None);
    }
    match level_str.parse::<Targets>() {
        Ok(targets) => (targets, None),
        Err(err) => (default, Some(err.to_string())),
    }
}
