// Copyright (c) The live-run Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::{Result, ensure};
use live_run::{
    driver::{DriveOutcome, RunDriver},
    events::{CancelReason, RunEvent},
    item::TestStatus,
    registry::RunRegistry,
    run::{Run, RunStatus},
};
use std::{sync::Arc, time::Duration};
use tokio::sync::{mpsc::unbounded_channel, oneshot};

const TESTS: usize = 20;

fn producer_events() -> Vec<RunEvent> {
    let mut events = vec![
        RunEvent::RunStarted {
            start_time: START_TIME.to_owned(),
        },
        RunEvent::PreRun {
            items: vec![suite("app", TESTS)],
            total_number_of_tests: Some(TESTS),
        },
    ];
    for n in 1..=TESTS {
        let id = format!("app.t{n}");
        events.push(RunEvent::TestStarted {
            test_number: n,
            id: id.clone(),
            start_time: START_TIME.to_owned(),
        });
        events.push(RunEvent::TestFinished {
            id,
            status: TestStatus::Success,
            end_time: START_TIME.to_owned(),
            execution_time: Some(Duration::from_millis(5)),
            failure: None,
        });
        events.push(RunEvent::CountersUpdated {
            disabled: 0,
            success: n,
            failure: 0,
            error: 0,
        });
    }
    events.push(RunEvent::RunFinished {
        status: RunStatus::Completed,
        end_time: "2019-05-01T14:22:06.000".to_owned(),
        execution_time: Some(Duration::from_millis(100)),
        error_stack: None,
        server_output: None,
    });
    events
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn consumer_polls_while_producer_streams() -> Result<()> {
    test_init();

    let registry = RunRegistry::new();
    let handle = Arc::new(RecordingHandle::default());
    let mut run = Run::new("reporter-1", Some(CONNECTION_NAME.to_owned()), vec![]);
    run.set_consumer_handle(handle.clone());
    let shared = registry.insert(run);

    let (tx, rx) = unbounded_channel();
    let (_cancel_tx, cancel_rx) = oneshot::channel();
    let driver = tokio::spawn(RunDriver::new(shared.clone()).drive(rx, cancel_rx));

    let consumer = {
        let shared = shared.clone();
        tokio::spawn(async move {
            let mut last = -1i64;
            loop {
                let snapshot = shared.snapshot();
                assert!(
                    snapshot.completed_count >= last,
                    "progress never goes backwards"
                );
                assert!(snapshot.completed_count <= TESTS as i64);
                last = snapshot.completed_count;
                if snapshot.status.is_terminal() {
                    return snapshot;
                }
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
    };

    for event in producer_events() {
        tx.send(event)?;
        tokio::task::yield_now().await;
    }
    drop(tx);

    let outcome = driver.await?;
    assert_eq!(
        outcome,
        DriveOutcome::Finished {
            applied: 3 + 3 * TESTS,
            skipped: 0
        }
    );

    let snapshot = consumer.await?;
    assert_eq!(snapshot.status, RunStatus::Completed);
    assert_eq!(snapshot.completed_count, TESTS as i64);
    assert_eq!(snapshot.display_name.as_deref(), Some("14:22:05 (HELLO)"));
    assert_eq!(
        shared.current_test().map(|t| t.id),
        Some(format!("app.t{TESTS}"))
    );
    ensure!(handle.close_count() == 1, "handle closed exactly once");
    Ok(())
}

#[tokio::test]
async fn cancellation_leaves_partial_state() -> Result<()> {
    test_init();

    let registry = RunRegistry::new();
    let handle = Arc::new(RecordingHandle::default());
    let mut run = Run::new("reporter-2", None, vec![]);
    run.set_consumer_handle(handle.clone());
    let shared = registry.insert(run);

    let (tx, rx) = unbounded_channel();
    let (cancel_tx, cancel_rx) = oneshot::channel();
    let driver = tokio::spawn(RunDriver::new(shared.clone()).drive(rx, cancel_rx));

    // Deliver the first few events, then cancel.
    let events = producer_events();
    for event in events.iter().take(5).cloned() {
        tx.send(event)?;
    }
    while shared.completed_count() != Some(1) {
        tokio::task::yield_now().await;
    }
    cancel_tx
        .send(CancelReason::UserRequested)
        .map_err(|_| color_eyre::eyre::eyre!("driver exited early"))?;

    let outcome = driver.await?;
    assert_eq!(
        outcome,
        DriveOutcome::Cancelled {
            reason: CancelReason::UserRequested
        }
    );

    let snapshot = shared.snapshot();
    assert_eq!(snapshot.status, RunStatus::Cancelled);
    ensure!(snapshot.end_time.is_some(), "cancellation sets the end time");
    assert_eq!(snapshot.completed_count, 1);
    assert_eq!(
        shared.lookup_test("app.t2").map(|t| t.status),
        Some(TestStatus::NotRun)
    );
    ensure!(handle.close_count() == 1, "handle closed exactly once");

    // Late events may still be applied directly, but the handle isn't closed again.
    registry.route("reporter-2", RunEvent::InfoEmitted { count: 3 })?;
    ensure!(!shared.release_consumer_handle(), "handle already released");
    ensure!(handle.close_count() == 1, "handle closed exactly once");
    Ok(())
}
