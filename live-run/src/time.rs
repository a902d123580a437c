// Copyright (c) The live-run Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Start markers for tracking how long a run has been going.
//!
//! A run records its start in two forms: the formatted wall-clock string the producer reported,
//! and an `Instant` (monotonic clock) taken at the same moment. Elapsed time is always measured on
//! the monotonic clock.

use chrono::{DateTime, Local};
use std::time::{Duration, Instant};

/// Format used for timestamps generated locally, e.g. by [`Run::record_start_now`].
///
/// [`Run::record_start_now`]: crate::run::Run::record_start_now
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Formats a local time the way producers format timestamps.
pub fn format_timestamp(time: DateTime<Local>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}

/// Returns the current local time, formatted with [`TIMESTAMP_FORMAT`].
pub fn now_timestamp() -> String {
    format_timestamp(Local::now())
}

#[derive(Clone, Debug)]
pub(crate) struct StartMarker {
    start_time: String,
    instant: Instant,
}

impl StartMarker {
    pub(crate) fn new(start_time: String) -> Self {
        Self {
            start_time,
            instant: Instant::now(),
        }
    }

    pub(crate) fn start_time(&self) -> &str {
        &self.start_time
    }

    pub(crate) fn elapsed(&self) -> Duration {
        self.instant.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn format_matches_producer_layout() {
        let time = Local
            .with_ymd_and_hms(2019, 5, 1, 14, 22, 5)
            .single()
            .expect("unambiguous local time");
        let formatted = format_timestamp(time);
        assert_eq!(formatted, "2019-05-01T14:22:05.000000");
        assert_eq!(&formatted[11..19], "14:22:05");
    }

    #[test]
    fn elapsed_is_monotonic() {
        let marker = StartMarker::new(now_timestamp());
        let first = marker.elapsed();
        std::thread::sleep(Duration::from_millis(10));
        assert!(marker.elapsed() >= first + Duration::from_millis(10));
    }
}
