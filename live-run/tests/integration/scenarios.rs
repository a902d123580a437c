// Copyright (c) The live-run Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::{Result, ensure};
use live_run::{
    counter::CounterCategory,
    errors::DisplayNameError,
    events::RunEvent,
    item::{FailureDetail, Item, Test, TestStatus, flatten},
    run::{Run, RunStatus},
};
use pretty_assertions::assert_eq;
use std::time::Duration;
use test_case::test_case;

#[test]
fn three_paths_five_tests() -> Result<()> {
    test_init();

    let paths = vec!["app.a".to_owned(), "app.b".to_owned(), "app.c".to_owned()];
    let mut run = Run::new("reporter-1", Some(CONNECTION_NAME.to_owned()), paths);
    run.record_start(START_TIME);
    run.ingest_tree([suite("app", 5)]);
    ensure!(run.test_count() == 5, "five tests are indexed");

    run.update_counter(CounterCategory::Success, 3);
    run.update_counter(CounterCategory::Failure, 1);
    run.update_counter(CounterCategory::Error, 0);
    ensure!(run.completed_count().is_none(), "disabled is still unset");
    run.update_counter(CounterCategory::Disabled, 0);
    assert_eq!(run.completed_count(), Some(4));

    run.set_total_number_of_tests(4);
    assert_eq!(run.completed_count(), Some(4));

    // A total that's too low, as happens when a cancellation races the final update.
    run.set_total_number_of_tests(3);
    assert_eq!(run.completed_count(), Some(3));
    assert_eq!(run.completed_count_or_sentinel(), 3);

    assert_eq!(run.path_list().len(), 3);
    assert_eq!(run.display_name()?, "14:22:05 (HELLO)");
    Ok(())
}

#[test_case(Some(CONNECTION_NAME), "14:22:05 (HELLO)"; "with connection")]
#[test_case(None, "14:22:05 (n/a)"; "without connection")]
fn display_names(connection_name: Option<&str>, expected: &str) -> Result<()> {
    let mut run = Run::new("reporter-1", connection_name.map(str::to_owned), vec![]);
    assert!(matches!(
        run.display_name(),
        Err(DisplayNameError::NotStarted(_))
    ));
    run.record_start(START_TIME);
    assert_eq!(run.display_name()?, expected);
    Ok(())
}

#[test]
fn snapshots_replace_and_updates_mutate() -> Result<()> {
    test_init();

    let mut run = Run::new("reporter-1", None, vec![]);
    run.ingest_tree([suite("a", 2), suite("b", 2)]);

    // A later snapshot of a.t2 with more fields populated.
    let mut updated = Test::new("a.t2");
    updated
        .set_status(TestStatus::Failure)
        .set_failure(FailureDetail {
            message: Some("expected 3, got 4".to_owned()),
            stack: Some("at line 12".to_owned()),
            expectations: vec!["3 = 4".to_owned()],
        });
    run.ingest_tree([Item::Test(updated)]);

    ensure!(run.test_count() == 4, "the duplicate id is indexed once");
    assert_eq!(
        run.lookup_test("a.t2").map(|t| t.status),
        Some(TestStatus::Failure)
    );
    // The tree still holds the earlier snapshot; only the index moved.
    assert_eq!(flatten(run.tree()).count(), 5);

    run.update_test("b.t1", |test| {
        test.set_status(TestStatus::Disabled);
    })?;
    assert_eq!(
        run.lookup_test("b.t1").map(|t| t.status),
        Some(TestStatus::Disabled)
    );

    let tree_before = run.tree().to_vec();
    let err = run
        .update_test("c.t1", |test| {
            test.set_status(TestStatus::Success);
        })
        .expect_err("c.t1 was never ingested");
    assert_eq!(err.id(), "c.t1");
    assert_eq!(run.tree(), tree_before.as_slice());
    Ok(())
}

#[test]
fn error_run_keeps_diagnostics() -> Result<()> {
    let mut run = Run::new("reporter-1", None, vec![]);
    for event in [
        RunEvent::RunStarted {
            start_time: START_TIME.to_owned(),
        },
        RunEvent::PreRun {
            items: vec![suite("app", 2)],
            total_number_of_tests: Some(2),
        },
        RunEvent::RunFinished {
            status: RunStatus::Error,
            end_time: "2019-05-01T14:22:06.000".to_owned(),
            execution_time: Some(Duration::from_millis(877)),
            error_stack: Some("ORA-04068: existing state of packages has been discarded".to_owned()),
            server_output: Some("first".to_owned()),
        },
    ] {
        run.apply(event)?;
    }
    // Setting a diagnostic again overwrites it.
    run.set_server_output("second");

    ensure!(run.is_terminal(), "run ended with an error");
    assert_eq!(run.status(), RunStatus::Error);
    assert_eq!(
        run.error_stack(),
        Some("ORA-04068: existing state of packages has been discarded")
    );
    assert_eq!(run.server_output(), Some("second"));
    assert_eq!(run.completed_count(), None);
    Ok(())
}
