// Copyright (c) The live-run Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Events delivered by a producer.
//!
//! A producer parses its wire protocol into [`RunEvent`]s and feeds them to a run, either directly
//! through [`Run::apply`] or over a channel to a [`RunDriver`](crate::driver::RunDriver).

use crate::{
    counter::CounterCategory,
    errors::RunEventError,
    item::{FailureDetail, Item, TestStatus},
    run::{Run, RunStatus},
};
use std::time::Duration;
use tracing::debug;

/// An event delivered by a producer.
///
/// Events from one producer arrive in order, but there is no ordering across kinds: a counter
/// update may arrive before or after the tree containing the test it counts.
#[derive(Clone, Debug, PartialEq)]
pub enum RunEvent {
    /// The run started.
    RunStarted {
        /// The time at which the run started, as formatted by the producer.
        start_time: String,
    },

    /// The producer announced what will run.
    PreRun {
        /// The tree of suites and tests.
        items: Vec<Item>,

        /// The number of tests that will run.
        total_number_of_tests: Option<usize>,
    },

    /// A tree snapshot, typically carrying more fields than an earlier one.
    TreeSnapshot {
        /// The items to ingest.
        items: Vec<Item>,
    },

    /// A test started running.
    TestStarted {
        /// The position of the test in the run.
        test_number: usize,

        /// The identifier of the test.
        id: String,

        /// The time at which the test started.
        start_time: String,
    },

    /// A test finished running.
    TestFinished {
        /// The identifier of the test.
        id: String,

        /// The final status of the test.
        status: TestStatus,

        /// The time at which the test finished.
        end_time: String,

        /// The time taken by the test.
        execution_time: Option<Duration>,

        /// Details about a failure or error.
        failure: Option<FailureDetail>,
    },

    /// Running totals for each outcome category.
    CountersUpdated {
        /// The number of disabled tests.
        disabled: usize,

        /// The number of successful tests.
        success: usize,

        /// The number of failed tests.
        failure: usize,

        /// The number of errored tests.
        error: usize,
    },

    /// The number of informational messages emitted so far.
    InfoEmitted {
        /// The count.
        count: usize,
    },

    /// The run finished, normally or not.
    RunFinished {
        /// The terminal status.
        status: RunStatus,

        /// The time at which the run finished.
        end_time: String,

        /// The time taken by the run.
        execution_time: Option<Duration>,

        /// The error stack, if the run errored.
        error_stack: Option<String>,

        /// Output produced on the server.
        server_output: Option<String>,
    },
}

impl RunEvent {
    /// Returns a short name for this kind of event.
    pub fn kind_str(&self) -> &'static str {
        match self {
            RunEvent::RunStarted { .. } => "run-started",
            RunEvent::PreRun { .. } => "pre-run",
            RunEvent::TreeSnapshot { .. } => "tree-snapshot",
            RunEvent::TestStarted { .. } => "test-started",
            RunEvent::TestFinished { .. } => "test-finished",
            RunEvent::CountersUpdated { .. } => "counters-updated",
            RunEvent::InfoEmitted { .. } => "info-emitted",
            RunEvent::RunFinished { .. } => "run-finished",
        }
    }
}

// Note: the order here matters -- it indicates severity of cancellation
/// The reason why a run is being cancelled.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum CancelReason {
    /// A user asked for the run to stop.
    UserRequested,

    /// The producer's session was lost.
    ProducerLost,
}

impl CancelReason {
    /// Returns a description of this reason.
    pub fn to_static_str(self) -> &'static str {
        match self {
            CancelReason::UserRequested => "user request",
            CancelReason::ProducerLost => "producer lost",
        }
    }
}

impl Run {
    /// Applies a producer event to this run.
    ///
    /// Events that refer to a test that isn't indexed leave the run unchanged and return
    /// [`RunEventError::TestNotFound`]; callers typically log these and carry on.
    pub fn apply(&mut self, event: RunEvent) -> Result<(), RunEventError> {
        let kind = event.kind_str();
        match event {
            RunEvent::RunStarted { start_time } => {
                self.record_start(start_time);
                self.set_status(RunStatus::Running);
            }
            RunEvent::PreRun {
                items,
                total_number_of_tests,
            } => {
                self.ingest_tree(items);
                if let Some(total) = total_number_of_tests {
                    self.set_total_number_of_tests(total);
                }
            }
            RunEvent::TreeSnapshot { items } => {
                self.ingest_tree(items);
            }
            RunEvent::TestStarted {
                test_number,
                id,
                start_time,
            } => {
                self.update_test(&id, |test| {
                    test.test_number = Some(test_number);
                    test.start_time = Some(start_time);
                })
                .map_err(|err| RunEventError::TestNotFound { event: kind, err })?;
                self.set_current(test_number, id);
            }
            RunEvent::TestFinished {
                id,
                status,
                end_time,
                execution_time,
                failure,
            } => {
                self.update_test(&id, |test| {
                    test.status = status;
                    test.end_time = Some(end_time);
                    test.execution_time = execution_time;
                    test.failure = failure;
                })
                .map_err(|err| RunEventError::TestNotFound { event: kind, err })?;
            }
            RunEvent::CountersUpdated {
                disabled,
                success,
                failure,
                error,
            } => {
                self.update_counter(CounterCategory::Disabled, disabled);
                self.update_counter(CounterCategory::Success, success);
                self.update_counter(CounterCategory::Failure, failure);
                self.update_counter(CounterCategory::Error, error);
            }
            RunEvent::InfoEmitted { count } => {
                self.set_info_count(count);
            }
            RunEvent::RunFinished {
                status,
                end_time,
                execution_time,
                error_stack,
                server_output,
            } => {
                self.set_status(status);
                self.set_end_time(end_time);
                if let Some(execution_time) = execution_time {
                    self.set_execution_time(execution_time);
                }
                if let Some(error_stack) = error_stack {
                    self.set_error_stack(error_stack);
                }
                if let Some(server_output) = server_output {
                    self.set_server_output(server_output);
                }
            }
        }
        debug!(reporter_id = %self.reporter_id(), event = kind, "applied event");
        Ok(())
    }
}
