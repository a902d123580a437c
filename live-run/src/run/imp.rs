// Copyright (c) The live-run Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    config::DisplayConfig,
    counter::{Counter, CounterCategory},
    errors::{
        ConsumerHandleError, DisplayNameError, RunNotStarted, RunStatusParseError, TestNotFound,
    },
    helpers::{char_range, skip_chars},
    item::{FlattenIndexed, Item, Test, TestPath, resolve, resolve_mut},
    time::{StartMarker, now_timestamp},
};
use indexmap::IndexMap;
use serde::Serialize;
use std::{fmt, str::FromStr, sync::Arc, time::Duration};
use tracing::{debug, trace, warn};

/// The live state of one execution of a test plan.
///
/// A `Run` is created once per session, fed by the producer as events arrive, and polled by
/// consumers. It owns the result tree and an index from test identifier to the leaf holding that
/// test. After every [`ingest_tree`](Self::ingest_tree), the index contains exactly the test
/// leaves reachable from the tree.
#[derive(Debug)]
pub struct Run {
    reporter_id: String,
    connection_name: Option<String>,
    path_list: Vec<String>,
    tree: Vec<Item>,
    index: IndexMap<String, TestPath>,
    counter: Counter,
    total_number_of_tests: Option<usize>,
    current_test_number: Option<usize>,
    current_test_id: Option<String>,
    start: Option<StartMarker>,
    end_time: Option<String>,
    execution_time: Option<Duration>,
    info_count: Option<usize>,
    error_stack: Option<String>,
    server_output: Option<String>,
    status: RunStatus,
    consumer_handle: Option<Arc<dyn ConsumerHandle>>,
    display: DisplayConfig,
}

impl Run {
    /// Creates a new, pending run.
    ///
    /// `reporter_id` routes producer events to this run; `path_list` is the list of scopes that
    /// were requested, and may be empty.
    pub fn new(
        reporter_id: impl Into<String>,
        connection_name: Option<String>,
        path_list: Vec<String>,
    ) -> Self {
        let reporter_id = reporter_id.into();
        debug!(
            %reporter_id,
            ?connection_name,
            paths = path_list.len(),
            "initializing run"
        );
        Self {
            reporter_id,
            connection_name,
            path_list,
            tree: vec![],
            index: IndexMap::new(),
            counter: Counter::new(),
            total_number_of_tests: None,
            current_test_number: None,
            current_test_id: None,
            start: None,
            end_time: None,
            execution_time: None,
            info_count: None,
            error_stack: None,
            server_output: None,
            status: RunStatus::Pending,
            consumer_handle: None,
            display: DisplayConfig::default(),
        }
    }

    /// Uses the given display settings for [`display_name`](Self::display_name).
    pub fn with_display_config(mut self, display: DisplayConfig) -> Self {
        self.display = display;
        self
    }

    /// Records the start of the run.
    ///
    /// `start_time` is the producer's formatted wall-clock time. A monotonic marker is taken at
    /// the same moment for elapsed-time bookkeeping. Calling this again resets both.
    pub fn record_start(&mut self, start_time: impl Into<String>) {
        let start_time = start_time.into();
        trace!(reporter_id = %self.reporter_id, %start_time, "recording start");
        self.start = Some(StartMarker::new(start_time));
    }

    /// Records the start of the run using the local clock.
    pub fn record_start_now(&mut self) {
        self.record_start(now_timestamp());
    }

    /// Appends `items` to the tree, then rebuilds the index from the whole tree.
    ///
    /// If an identifier occurs more than once, the last occurrence in traversal order wins: later
    /// snapshots of a test arrive with more fields populated and fully replace earlier ones.
    pub fn ingest_tree(&mut self, items: impl IntoIterator<Item = Item>) {
        let before = self.tree.len();
        self.tree.extend(items);
        self.reindex();
        debug!(
            reporter_id = %self.reporter_id,
            new_items = self.tree.len() - before,
            indexed_tests = self.index.len(),
            "ingested tree"
        );
    }

    fn reindex(&mut self) {
        let mut index = IndexMap::with_capacity(self.index.len());
        let mut replaced = 0usize;
        for (path, test) in FlattenIndexed::new(&self.tree) {
            if index.insert(test.id.clone(), path).is_some() {
                replaced += 1;
            }
        }
        if replaced > 0 {
            trace!(
                reporter_id = %self.reporter_id,
                replaced,
                "duplicate test ids in tree, later occurrences won"
            );
        }
        self.index = index;
    }

    /// Returns the test with the given identifier.
    pub fn lookup_test(&self, id: &str) -> Option<&Test> {
        let path = self.index.get(id)?;
        resolve(&self.tree, path)
    }

    /// Updates the indexed test with the given identifier in place.
    ///
    /// The tree's structure and the index are untouched: if `f` changes the test's identifier, the
    /// original identifier is restored. Returns [`TestNotFound`] if `id` isn't indexed.
    pub fn update_test<F>(&mut self, id: &str, f: F) -> Result<(), TestNotFound>
    where
        F: FnOnce(&mut Test),
    {
        let test = self
            .index
            .get(id)
            .and_then(|path| resolve_mut(&mut self.tree, path))
            .ok_or_else(|| TestNotFound::new(id))?;
        f(test);
        if test.id != id {
            warn!(
                reporter_id = %self.reporter_id,
                id,
                new_id = %test.id,
                "test updates cannot change the identifier, keeping the original"
            );
            test.id = id.to_owned();
        }
        Ok(())
    }

    /// Sets one counter category.
    pub fn update_counter(&mut self, category: CounterCategory, value: usize) {
        self.counter.set(category, value);
    }

    /// Sets the test that is executing now, along with its position in the run.
    pub fn set_current(&mut self, test_number: usize, test_id: impl Into<String>) {
        self.current_test_number = Some(test_number);
        self.current_test_id = Some(test_id.into());
    }

    /// Sets the expected total number of tests.
    pub fn set_total_number_of_tests(&mut self, total: usize) {
        self.total_number_of_tests = Some(total);
    }

    /// Sets the status of this run.
    pub fn set_status(&mut self, status: RunStatus) {
        if self.status != status {
            debug!(
                reporter_id = %self.reporter_id,
                from = %self.status,
                to = %status,
                "run status changed"
            );
        }
        self.status = status;
    }

    /// Sets the time at which this run ended, as formatted by the producer.
    pub fn set_end_time(&mut self, end_time: impl Into<String>) {
        self.end_time = Some(end_time.into());
    }

    /// Sets the total time taken by this run.
    pub fn set_execution_time(&mut self, execution_time: Duration) {
        self.execution_time = Some(execution_time);
    }

    /// Sets the number of informational messages emitted.
    pub fn set_info_count(&mut self, info_count: usize) {
        self.info_count = Some(info_count);
    }

    /// Sets the error stack of this run.
    pub fn set_error_stack(&mut self, error_stack: impl Into<String>) {
        self.error_stack = Some(error_stack.into());
    }

    /// Sets the server output of this run.
    pub fn set_server_output(&mut self, server_output: impl Into<String>) {
        self.server_output = Some(server_output.into());
    }

    /// Attaches a handle that is closed on cooperative shutdown.
    ///
    /// Any previously attached handle is dropped without being closed.
    pub fn set_consumer_handle(&mut self, handle: Arc<dyn ConsumerHandle>) {
        self.consumer_handle = Some(handle);
    }

    /// Detaches the consumer handle, if any, without closing it.
    pub fn take_consumer_handle(&mut self) -> Option<Arc<dyn ConsumerHandle>> {
        self.consumer_handle.take()
    }

    /// Detaches and closes the consumer handle.
    ///
    /// Returns true if a handle was attached. Closing happens at most once per attached handle.
    pub fn release_consumer_handle(&mut self) -> bool {
        match self.take_consumer_handle() {
            Some(handle) => {
                close_consumer_handle(&self.reporter_id, handle.as_ref());
                true
            }
            None => false,
        }
    }

    // ---
    // Derived reads
    // ---

    /// Returns the number of completed tests, or `None` if any counter category is still unset.
    ///
    /// Once the expected total is known, the result never exceeds it. During a cancellation the
    /// counters can briefly run ahead of the total; the clamp keeps the displayed value sane.
    pub fn completed_count(&self) -> Option<usize> {
        let sum = self.counter.sum()?;
        match self.total_number_of_tests {
            Some(total) if sum > total => {
                trace!(
                    reporter_id = %self.reporter_id,
                    sum,
                    total,
                    "completed count exceeds total, clamping"
                );
                Some(total)
            }
            _ => Some(sum),
        }
    }

    /// Like [`completed_count`](Self::completed_count), with unknown reported as `-1`.
    pub fn completed_count_or_sentinel(&self) -> i64 {
        self.completed_count()
            .and_then(|n| i64::try_from(n).ok())
            .unwrap_or(-1)
    }

    /// Returns the display name of this run: `HH:MM:SS (connection)`.
    ///
    /// The clock time is taken from a fixed character range of the start time, and the connection
    /// label is the connection name minus its fixed-length prefix, or `n/a` if there's no
    /// connection name. Both are controlled by [`DisplayConfig`].
    ///
    /// A connection name made up of only the prefix yields an empty label, e.g. `14:22:05 ()`.
    pub fn display_name(&self) -> Result<String, DisplayNameError> {
        let start_time = self.start_time().ok_or(RunNotStarted)?;
        let display = &self.display;
        let clock = char_range(start_time, display.clock_start, display.clock_end).ok_or_else(
            || DisplayNameError::StartTimeTooShort {
                start_time: start_time.to_owned(),
                start: display.clock_start,
                end: display.clock_end,
            },
        )?;
        let connection = match &self.connection_name {
            Some(name) => skip_chars(name, display.connection_prefix_len).ok_or_else(|| {
                DisplayNameError::ConnectionNameTooShort {
                    connection_name: name.clone(),
                    prefix_len: display.connection_prefix_len,
                }
            })?,
            None => display.missing_connection_label.as_str(),
        };
        Ok(format!("{clock} ({connection})"))
    }

    /// Returns the time elapsed since [`record_start`](Self::record_start) on the monotonic clock.
    pub fn elapsed(&self) -> Result<Duration, RunNotStarted> {
        self.start
            .as_ref()
            .map(StartMarker::elapsed)
            .ok_or(RunNotStarted)
    }

    /// Returns true once the run has a terminal status and an end time.
    ///
    /// Late events may still mutate a terminal run.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal() && self.end_time.is_some()
    }

    // ---
    // Accessors
    // ---

    /// Returns the reporter ID.
    pub fn reporter_id(&self) -> &str {
        &self.reporter_id
    }

    /// Returns the connection name.
    pub fn connection_name(&self) -> Option<&str> {
        self.connection_name.as_deref()
    }

    /// Returns the requested paths.
    pub fn path_list(&self) -> &[String] {
        &self.path_list
    }

    /// Returns the result tree.
    pub fn tree(&self) -> &[Item] {
        &self.tree
    }

    /// Returns the indexed tests, ordered by the first time each identifier was seen.
    pub fn tests(&self) -> impl Iterator<Item = &Test> + '_ {
        self.index
            .values()
            .filter_map(|path| resolve(&self.tree, path))
    }

    /// Returns the number of indexed tests.
    pub fn test_count(&self) -> usize {
        self.index.len()
    }

    /// Returns the counter.
    pub fn counter(&self) -> &Counter {
        &self.counter
    }

    /// Returns the expected total number of tests, if known.
    pub fn total_number_of_tests(&self) -> Option<usize> {
        self.total_number_of_tests
    }

    /// Returns the position of the test executing now.
    pub fn current_test_number(&self) -> Option<usize> {
        self.current_test_number
    }

    /// Returns the test executing now, if it's indexed.
    pub fn current_test(&self) -> Option<&Test> {
        self.current_test_id
            .as_deref()
            .and_then(|id| self.lookup_test(id))
    }

    /// Returns the identifier of the test executing now.
    pub fn current_test_id(&self) -> Option<&str> {
        self.current_test_id.as_deref()
    }

    /// Returns the start time, as formatted by the producer.
    pub fn start_time(&self) -> Option<&str> {
        self.start.as_ref().map(StartMarker::start_time)
    }

    /// Returns the end time, as formatted by the producer.
    pub fn end_time(&self) -> Option<&str> {
        self.end_time.as_deref()
    }

    /// Returns the total time taken by this run, once reported.
    pub fn execution_time(&self) -> Option<Duration> {
        self.execution_time
    }

    /// Returns the number of informational messages emitted.
    pub fn info_count(&self) -> Option<usize> {
        self.info_count
    }

    /// Returns the error stack.
    pub fn error_stack(&self) -> Option<&str> {
        self.error_stack.as_deref()
    }

    /// Returns the server output.
    pub fn server_output(&self) -> Option<&str> {
        self.server_output.as_deref()
    }

    /// Returns the status of this run.
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Returns true if a consumer handle is attached.
    pub fn has_consumer_handle(&self) -> bool {
        self.consumer_handle.is_some()
    }
}

impl Drop for Run {
    fn drop(&mut self) {
        // Covers runs that end without a driver, e.g. through `apply` or `SharedRun::cancel`.
        self.release_consumer_handle();
    }
}

pub(crate) fn close_consumer_handle(reporter_id: &str, handle: &dyn ConsumerHandle) {
    match handle.close() {
        Ok(()) => debug!(%reporter_id, "closed consumer handle"),
        Err(err) => warn!(%reporter_id, "error closing consumer handle: {err}"),
    }
}

/// A resource a run holds for cooperative shutdown, such as a session used to abort the run.
///
/// The run never does I/O on the handle except to close it.
pub trait ConsumerHandle: fmt::Debug + Send + Sync {
    /// Closes the underlying resource.
    fn close(&self) -> Result<(), ConsumerHandleError>;
}

/// The status of a run.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub enum RunStatus {
    /// The run has been created but hasn't started.
    #[default]
    Pending,

    /// The run is in progress.
    Running,

    /// The run completed normally.
    Completed,

    /// The run ended because of an error.
    Error,

    /// The run was cancelled.
    Cancelled,
}

impl RunStatus {
    /// Returns the string forms of all statuses.
    pub fn variants() -> [&'static str; 5] {
        ["pending", "running", "completed", "error", "cancelled"]
    }

    /// Returns the string form of this status.
    pub fn to_static_str(self) -> &'static str {
        match self {
            RunStatus::Pending => "pending",
            RunStatus::Running => "running",
            RunStatus::Completed => "completed",
            RunStatus::Error => "error",
            RunStatus::Cancelled => "cancelled",
        }
    }

    /// Returns true if this status ends a run.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Completed | RunStatus::Error | RunStatus::Cancelled
        )
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_static_str())
    }
}

impl FromStr for RunStatus {
    type Err = RunStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s {
            "pending" => RunStatus::Pending,
            "running" => RunStatus::Running,
            "completed" => RunStatus::Completed,
            "error" => RunStatus::Error,
            "cancelled" => RunStatus::Cancelled,
            other => return Err(RunStatusParseError::new(other)),
        };
        Ok(status)
    }
}
