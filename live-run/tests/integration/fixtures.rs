// Copyright (c) The live-run Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use live_run::{
    errors::ConsumerHandleError,
    item::{Item, Suite, Test},
    output::init_logging,
    run::ConsumerHandle,
};
use std::sync::atomic::{AtomicUsize, Ordering};

pub(crate) const START_TIME: &str = "2019-05-01T14:22:05.123";

/// A connection name with the 15-character structural prefix producers use.
pub(crate) const CONNECTION_NAME: &str = "CONN_NAME_PFX__HELLO";

pub(crate) fn test_init() {
    init_logging();
}

/// A suite called `suite_id` holding tests `{suite_id}.t1` through `{suite_id}.t{count}`.
pub(crate) fn suite(suite_id: &str, count: usize) -> Item {
    let mut suite = Suite::new(suite_id);
    suite.set_name(suite_id);
    suite.add_items((1..=count).map(|n| {
        let mut test = Test::new(format!("{suite_id}.t{n}"));
        test.set_description(format!("test {n} of {suite_id}"));
        test
    }));
    Item::Suite(suite)
}

#[derive(Debug, Default)]
pub(crate) struct RecordingHandle {
    closed: AtomicUsize,
}

impl RecordingHandle {
    pub(crate) fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

impl ConsumerHandle for RecordingHandle {
    fn close(&self) -> Result<(), ConsumerHandleError> {
        if self.closed.fetch_add(1, Ordering::SeqCst) > 0 {
            return Err(ConsumerHandleError::new("already closed"));
        }
        Ok(())
    }
}
