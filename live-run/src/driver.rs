// Copyright (c) The live-run Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The producer-side task that feeds events into a shared run.

use crate::{
    events::{CancelReason, RunEvent},
    run::SharedRun,
    time::now_timestamp,
};
use tokio::sync::{mpsc::UnboundedReceiver, oneshot};
use tracing::{debug, warn};

/// Applies producer events to a [`SharedRun`] until the producer is done or the run is cancelled.
///
/// The driver is the run's only writer. Consumers poll the same `SharedRun` concurrently.
#[derive(Clone, Debug)]
pub struct RunDriver {
    run: SharedRun,
}

/// How [`RunDriver::drive`] ended.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DriveOutcome {
    /// The producer closed its channel.
    Finished {
        /// The number of events applied.
        applied: usize,

        /// The number of events skipped because they referred to unknown tests.
        skipped: usize,
    },

    /// The run was cancelled.
    Cancelled {
        /// The reason for cancellation.
        reason: CancelReason,
    },
}

impl RunDriver {
    /// Creates a new driver for the given run.
    pub fn new(run: SharedRun) -> Self {
        Self { run }
    }

    /// Returns the run this driver writes to.
    pub fn run(&self) -> &SharedRun {
        &self.run
    }

    /// Drives the run.
    ///
    /// Events are applied in the order they're received. If `cancel_rx` fires, the run is marked
    /// cancelled with the current time as its end time, and any events not yet received are
    /// dropped. A dropped `cancel_rx` sender means the run can no longer be cancelled.
    ///
    /// The run's consumer handle is released on every exit path, including if this future is
    /// dropped before completion.
    pub fn drive(
        self,
        events: UnboundedReceiver<RunEvent>,
        cancel_rx: oneshot::Receiver<CancelReason>,
    ) -> impl Future<Output = DriveOutcome> + Send + 'static {
        // Created outside the async block so that a future dropped before its first poll still
        // releases the handle.
        let release = ReleaseOnDrop {
            run: self.run.clone(),
        };
        async move {
            let _release = release;
            self.drive_impl(events, cancel_rx).await
        }
    }

    async fn drive_impl(
        self,
        mut events: UnboundedReceiver<RunEvent>,
        cancel_rx: oneshot::Receiver<CancelReason>,
    ) -> DriveOutcome {
        let mut cancel_rx = std::pin::pin!(cancel_rx);
        let mut cancel_rx_done = false;
        let mut applied = 0usize;
        let mut skipped = 0usize;

        loop {
            tokio::select! {
                // Cancellation takes priority over pending events.
                biased;

                res = &mut cancel_rx, if !cancel_rx_done => {
                    cancel_rx_done = true;
                    match res {
                        Ok(reason) => {
                            debug!(
                                reporter_id = %self.run.reporter_id(),
                                reason = reason.to_static_str(),
                                "cancelling run"
                            );
                            events.close();
                            self.run.cancel(now_timestamp());
                            break DriveOutcome::Cancelled { reason };
                        }
                        Err(_) => {
                            debug!("cancel sender dropped, run can no longer be cancelled");
                            continue;
                        }
                    }
                }
                event = events.recv() => {
                    match event {
                        Some(event) => match self.run.apply(event) {
                            Ok(()) => applied += 1,
                            Err(err) => {
                                warn!(
                                    reporter_id = %self.run.reporter_id(),
                                    "skipping event: {err}"
                                );
                                skipped += 1;
                            }
                        },
                        None => {
                            debug!(
                                reporter_id = %self.run.reporter_id(),
                                applied,
                                skipped,
                                "producer finished"
                            );
                            break DriveOutcome::Finished { applied, skipped };
                        }
                    }
                }
            }
        }
    }
}

struct ReleaseOnDrop {
    run: SharedRun,
}

impl Drop for ReleaseOnDrop {
    fn drop(&mut self) {
        self.run.release_consumer_handle();
    }
}
