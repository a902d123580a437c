// Copyright (c) The live-run Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by live-run.

use crate::{item::TestStatus, run::RunStatus};
use camino::Utf8PathBuf;
use config::ConfigError;
use std::fmt;
use thiserror::Error;

/// A test identifier was not present in a run's index.
///
/// This is a normal outcome: producers may report a test before the tree containing it has been
/// ingested.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("test `{id}` not found in run")]
pub struct TestNotFound {
    id: String,
}

impl TestNotFound {
    pub(crate) fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Returns the identifier that was looked up.
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// An operation required the run to have been started, but `record_start` was never called.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Error)]
#[error("run has not been started (record_start was never called)")]
pub struct RunNotStarted;

/// An error that occurred while computing a run's display name.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[non_exhaustive]
pub enum DisplayNameError {
    /// The run has no start time yet.
    #[error(transparent)]
    NotStarted(#[from] RunNotStarted),

    /// The start time is too short to contain a clock time at the configured range.
    #[error("start time `{start_time}` does not contain a clock time at characters {start}..{end}")]
    StartTimeTooShort {
        /// The start time.
        start_time: String,

        /// The first character of the clock time.
        start: usize,

        /// One past the last character of the clock time.
        end: usize,
    },

    /// The connection name is shorter than its fixed structural prefix.
    #[error(
        "connection name `{connection_name}` is shorter than its {prefix_len}-character prefix"
    )]
    ConnectionNameTooShort {
        /// The connection name.
        connection_name: String,

        /// The length of the prefix that was expected.
        prefix_len: usize,
    },
}

/// Error returned while parsing a [`RunStatus`] from a string.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error(
    "unrecognized run status: {input}\n(known values: {})",
    RunStatus::variants().join(", "),
)]
pub struct RunStatusParseError {
    input: String,
}

impl RunStatusParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// Error returned while parsing a [`TestStatus`](crate::item::TestStatus) from a string.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error(
    "unrecognized test status: {input}\n(known values: {})",
    TestStatus::variants().join(", "),
)]
pub struct TestStatusParseError {
    input: String,
}

impl TestStatusParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// An error that occurred while applying a producer event to a run.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[non_exhaustive]
pub enum RunEventError {
    /// The event referred to a test that isn't in the run's index.
    #[error("event `{event}` could not be applied")]
    TestNotFound {
        /// The kind of event.
        event: &'static str,

        /// The underlying error.
        #[source]
        err: TestNotFound,
    },
}

/// An event was routed to a reporter ID that no run is registered under.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("no run registered for reporter ID `{reporter_id}`")]
pub struct UnknownReporterId {
    reporter_id: String,
}

impl UnknownReporterId {
    pub(crate) fn new(reporter_id: impl Into<String>) -> Self {
        Self {
            reporter_id: reporter_id.into(),
        }
    }

    /// Returns the reporter ID that was routed to.
    pub fn reporter_id(&self) -> &str {
        &self.reporter_id
    }
}

/// An error returned by [`RunRegistry::route`](crate::registry::RunRegistry::route).
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum RouteError {
    /// No run is registered under the reporter ID.
    #[error(transparent)]
    UnknownReporterId(#[from] UnknownReporterId),

    /// The run couldn't apply the event.
    #[error(transparent)]
    Event(#[from] RunEventError),
}

/// An error returned by a [`ConsumerHandle`](crate::run::ConsumerHandle) while closing it.
#[derive(Debug, Error)]
#[error("failed to close consumer handle: {message}")]
pub struct ConsumerHandleError {
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl ConsumerHandleError {
    /// Creates a new error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new error wrapping an underlying cause.
    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// An error that occurred while parsing the live-run config.
#[derive(Debug, Error)]
#[error("failed to parse live-run config{}", ConfigFileDisplay(.config_file.as_ref()))]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Option<Utf8PathBuf>,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: Option<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self { config_file, kind }
    }

    /// Returns the config file that failed to parse, if any.
    pub fn config_file(&self) -> Option<&Utf8PathBuf> {
        self.config_file.as_ref()
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

struct ConfigFileDisplay<'a>(Option<&'a Utf8PathBuf>);

impl fmt::Display for ConfigFileDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(path) => write!(f, " at `{path}`"),
            None => Ok(()),
        }
    }
}

/// The kind of error that occurred while parsing the config.
///
/// Returned by [`ConfigParseError::kind`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),

    /// The configured clock range is empty or reversed.
    #[error("invalid clock range in [display]: {start}..{end}")]
    InvalidClockRange {
        /// The configured start.
        start: usize,

        /// The configured end.
        end: usize,
    },
}
