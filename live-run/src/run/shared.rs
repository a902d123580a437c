// Copyright (c) The live-run Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{Run, RunStatus, imp::close_consumer_handle};
use crate::{
    counter::CounterCategory,
    errors::{DisplayNameError, RunEventError, TestNotFound},
    events::RunEvent,
    item::{Item, Test},
};
use serde::Serialize;
use std::{
    sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

/// A [`Run`] shared between one producer and any number of consumers.
///
/// Every accessor takes the lock once, so individual reads and writes never tear. Nothing is
/// guaranteed across calls: a consumer that reads the status and then the completed count may see
/// values from different moments. Use [`snapshot`](Self::snapshot) to read everything at once.
///
/// Cloning a `SharedRun` produces another handle to the same run.
#[derive(Clone, Debug)]
pub struct SharedRun {
    inner: Arc<RwLock<Run>>,
}

impl SharedRun {
    /// Wraps a run for sharing.
    pub fn new(run: Run) -> Self {
        Self {
            inner: Arc::new(RwLock::new(run)),
        }
    }

    /// Runs `f` with shared access to the run.
    pub fn read<T>(&self, f: impl FnOnce(&Run) -> T) -> T {
        f(&self.read_guard())
    }

    /// Runs `f` with exclusive access to the run.
    pub fn write<T>(&self, f: impl FnOnce(&mut Run) -> T) -> T {
        f(&mut self.write_guard())
    }

    // A writer that panicked mid-update leaves the run in whatever shape it had; consumers keep
    // reading it.
    fn read_guard(&self) -> RwLockReadGuard<'_, Run> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, Run> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ---
    // Producer side
    // ---

    /// Applies a producer event. See [`Run::apply`].
    pub fn apply(&self, event: RunEvent) -> Result<(), RunEventError> {
        self.write(|run| run.apply(event))
    }

    /// See [`Run::record_start`].
    pub fn record_start(&self, start_time: impl Into<String>) {
        self.write(|run| run.record_start(start_time));
    }

    /// See [`Run::ingest_tree`].
    pub fn ingest_tree(&self, items: impl IntoIterator<Item = Item>) {
        self.write(|run| run.ingest_tree(items));
    }

    /// See [`Run::update_test`].
    pub fn update_test<F>(&self, id: &str, f: F) -> Result<(), TestNotFound>
    where
        F: FnOnce(&mut Test),
    {
        self.write(|run| run.update_test(id, f))
    }

    /// See [`Run::update_counter`].
    pub fn update_counter(&self, category: CounterCategory, value: usize) {
        self.write(|run| run.update_counter(category, value));
    }

    /// See [`Run::set_current`].
    pub fn set_current(&self, test_number: usize, test_id: impl Into<String>) {
        self.write(|run| run.set_current(test_number, test_id));
    }

    /// See [`Run::set_status`].
    pub fn set_status(&self, status: RunStatus) {
        self.write(|run| run.set_status(status));
    }

    /// See [`Run::set_end_time`].
    pub fn set_end_time(&self, end_time: impl Into<String>) {
        self.write(|run| run.set_end_time(end_time));
    }

    /// Marks the run as cancelled and sets its end time, under a single lock, then releases the
    /// consumer handle.
    pub fn cancel(&self, end_time: impl Into<String>) {
        self.write(|run| {
            run.set_status(RunStatus::Cancelled);
            run.set_end_time(end_time);
        });
        self.release_consumer_handle();
    }

    /// Detaches and closes the consumer handle, if any.
    ///
    /// The handle is closed after the lock is released, so consumers are never blocked on it.
    pub fn release_consumer_handle(&self) -> bool {
        let (reporter_id, handle) = self.write(|run| {
            (run.reporter_id().to_owned(), run.take_consumer_handle())
        });
        match handle {
            Some(handle) => {
                close_consumer_handle(&reporter_id, handle.as_ref());
                true
            }
            None => false,
        }
    }

    // ---
    // Consumer side
    // ---

    /// Returns the reporter ID.
    pub fn reporter_id(&self) -> String {
        self.read(|run| run.reporter_id().to_owned())
    }

    /// Returns the status.
    pub fn status(&self) -> RunStatus {
        self.read(Run::status)
    }

    /// See [`Run::completed_count`].
    pub fn completed_count(&self) -> Option<usize> {
        self.read(Run::completed_count)
    }

    /// Returns the expected total number of tests, if known.
    pub fn total_number_of_tests(&self) -> Option<usize> {
        self.read(Run::total_number_of_tests)
    }

    /// Returns a copy of the test executing now.
    pub fn current_test(&self) -> Option<Test> {
        self.read(|run| run.current_test().cloned())
    }

    /// Returns a copy of the test with the given identifier.
    pub fn lookup_test(&self, id: &str) -> Option<Test> {
        self.read(|run| run.lookup_test(id).cloned())
    }

    /// Returns the error stack.
    pub fn error_stack(&self) -> Option<String> {
        self.read(|run| run.error_stack().map(str::to_owned))
    }

    /// Returns the server output.
    pub fn server_output(&self) -> Option<String> {
        self.read(|run| run.server_output().map(str::to_owned))
    }

    /// See [`Run::display_name`].
    pub fn display_name(&self) -> Result<String, DisplayNameError> {
        self.read(Run::display_name)
    }

    /// Reads every consumer-visible field under a single lock.
    pub fn snapshot(&self) -> RunSnapshot {
        self.read(RunSnapshot::new)
    }
}

impl From<Run> for SharedRun {
    fn from(run: Run) -> Self {
        Self::new(run)
    }
}

/// A point-in-time copy of the consumer-visible state of a run.
///
/// Returned by [`SharedRun::snapshot`]. Unlike individual accessors, all fields come from the same
/// moment.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RunSnapshot {
    /// The reporter ID.
    pub reporter_id: String,

    /// The connection name.
    pub connection_name: Option<String>,

    /// The requested paths.
    pub path_list: Vec<String>,

    /// The display name, if the run has started and the name could be computed.
    pub display_name: Option<String>,

    /// The status.
    pub status: RunStatus,

    /// The number of indexed tests.
    pub test_count: usize,

    /// The expected total number of tests.
    pub total_number_of_tests: Option<usize>,

    /// The number of completed tests; `-1` if not yet known.
    pub completed_count: i64,

    /// The position of the test executing now.
    pub current_test_number: Option<usize>,

    /// The test executing now.
    pub current_test: Option<Test>,

    /// The start time.
    pub start_time: Option<String>,

    /// The end time.
    pub end_time: Option<String>,

    /// The total time taken by the run.
    #[serde(serialize_with = "crate::helpers::serialize_duration_secs")]
    pub execution_time: Option<Duration>,

    /// The number of informational messages emitted.
    pub info_count: Option<usize>,

    /// The error stack.
    pub error_stack: Option<String>,

    /// The server output.
    pub server_output: Option<String>,
}

impl RunSnapshot {
    fn new(run: &Run) -> Self {
        Self {
            reporter_id: run.reporter_id().to_owned(),
            connection_name: run.connection_name().map(str::to_owned),
            path_list: run.path_list().to_vec(),
            display_name: run.display_name().ok(),
            status: run.status(),
            test_count: run.test_count(),
            total_number_of_tests: run.total_number_of_tests(),
            completed_count: run.completed_count_or_sentinel(),
            current_test_number: run.current_test_number(),
            current_test: run.current_test().cloned(),
            start_time: run.start_time().map(str::to_owned),
            end_time: run.end_time().map(str::to_owned),
            execution_time: run.execution_time(),
            info_count: run.info_count(),
            error_stack: run.error_stack().map(str::to_owned),
            server_output: run.server_output().map(str::to_owned),
        }
    }

    /// Renders this snapshot as pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
