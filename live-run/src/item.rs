// Copyright (c) The live-run Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The result tree: suites containing tests.
//!
//! A run's tree is an ordered list of [`Item`]s. Order is execution and display order, and is
//! preserved everywhere. The only traversal is [`flatten`], a depth-first walk that yields the
//! [`Test`] leaves in child order.

use crate::errors::TestStatusParseError;
use serde::Serialize;
use smallvec::SmallVec;
use std::{fmt, iter::Enumerate, slice, str::FromStr, time::Duration};

/// A node in the result tree.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Item {
    /// A leaf test.
    Test(Test),

    /// A suite grouping other items.
    Suite(Suite),
}

impl Item {
    /// Returns the identifier of this item.
    pub fn id(&self) -> &str {
        match self {
            Item::Test(test) => &test.id,
            Item::Suite(suite) => &suite.id,
        }
    }

    /// Returns the test leaves reachable from this item, depth-first in child order.
    ///
    /// A test yields itself.
    pub fn flatten(&self) -> Flatten<'_> {
        flatten(slice::from_ref(self))
    }
}

impl From<Test> for Item {
    fn from(test: Test) -> Self {
        Item::Test(test)
    }
}

impl From<Suite> for Item {
    fn from(suite: Suite) -> Self {
        Item::Suite(suite)
    }
}

/// A suite: an ordered group of tests and nested suites.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Suite {
    /// The identifier of this suite.
    pub id: String,

    /// The name of this suite.
    pub name: Option<String>,

    /// A description of this suite.
    pub description: Option<String>,

    /// The children of this suite, in execution order.
    pub items: Vec<Item>,
}

impl Suite {
    /// Creates a new, empty suite.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            description: None,
            items: vec![],
        }
    }

    /// Sets the name of this suite.
    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the description of this suite.
    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    /// Appends a child item.
    pub fn add_item(&mut self, item: impl Into<Item>) -> &mut Self {
        self.items.push(item.into());
        self
    }

    /// Appends several child items.
    pub fn add_items(&mut self, items: impl IntoIterator<Item = impl Into<Item>>) -> &mut Self {
        for item in items {
            self.add_item(item);
        }
        self
    }

    /// Returns the test leaves in this suite, depth-first in child order.
    pub fn tests(&self) -> Flatten<'_> {
        flatten(&self.items)
    }
}

/// A leaf test.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Test {
    /// The identifier of this test, unique within a run.
    pub id: String,

    /// The name of this test.
    pub name: Option<String>,

    /// A description of this test.
    pub description: Option<String>,

    /// The position of this test in the execution order, once known.
    pub test_number: Option<usize>,

    /// The status of this test.
    pub status: TestStatus,

    /// The time at which this test started, as formatted by the producer.
    pub start_time: Option<String>,

    /// The time at which this test finished, as formatted by the producer.
    pub end_time: Option<String>,

    /// The time taken by this test.
    #[serde(serialize_with = "crate::helpers::serialize_duration_secs")]
    pub execution_time: Option<Duration>,

    /// Details about a failure or error, if any.
    pub failure: Option<FailureDetail>,

    /// Output produced by the test on the server.
    pub server_output: Option<String>,

    /// Warnings raised while running the test.
    pub warnings: Vec<String>,
}

impl Test {
    /// Creates a new test that hasn't run yet.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            description: None,
            test_number: None,
            status: TestStatus::NotRun,
            start_time: None,
            end_time: None,
            execution_time: None,
            failure: None,
            server_output: None,
            warnings: vec![],
        }
    }

    /// Sets the name of this test.
    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the description of this test.
    pub fn set_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the status of this test.
    pub fn set_status(&mut self, status: TestStatus) -> &mut Self {
        self.status = status;
        self
    }

    /// Sets the failure details for this test.
    pub fn set_failure(&mut self, failure: FailureDetail) -> &mut Self {
        self.failure = Some(failure);
        self
    }

    /// Returns true if this test has finished, whatever the outcome.
    pub fn is_finished(&self) -> bool {
        self.status != TestStatus::NotRun
    }
}

/// The status of a single test.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub enum TestStatus {
    /// The test hasn't run yet.
    #[default]
    NotRun,

    /// The test passed.
    Success,

    /// An expectation in the test failed.
    Failure,

    /// The test raised an unexpected error.
    Error,

    /// The test is disabled.
    Disabled,
}

impl TestStatus {
    /// Returns the string forms of all statuses.
    pub fn variants() -> [&'static str; 5] {
        ["not-run", "success", "failure", "error", "disabled"]
    }

    /// Returns the string form of this status.
    pub fn to_static_str(self) -> &'static str {
        match self {
            TestStatus::NotRun => "not-run",
            TestStatus::Success => "success",
            TestStatus::Failure => "failure",
            TestStatus::Error => "error",
            TestStatus::Disabled => "disabled",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_static_str())
    }
}

impl FromStr for TestStatus {
    type Err = TestStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s {
            "not-run" => TestStatus::NotRun,
            "success" => TestStatus::Success,
            "failure" => TestStatus::Failure,
            "error" => TestStatus::Error,
            "disabled" => TestStatus::Disabled,
            other => return Err(TestStatusParseError::new(other)),
        };
        Ok(status)
    }
}

/// Details attached to a failed or errored test.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct FailureDetail {
    /// A short message describing the failure.
    pub message: Option<String>,

    /// The error stack, if the test errored.
    pub stack: Option<String>,

    /// The expectations that failed, in the order they were reported.
    pub expectations: Vec<String>,
}

/// The position of a test leaf in a tree: one child index per level.
pub type TestPath = SmallVec<[usize; 4]>;

/// Returns the test leaves reachable from `items`, depth-first in child order.
///
/// The iterator is lazy and finite. Calling this again restarts the walk.
pub fn flatten(items: &[Item]) -> Flatten<'_> {
    Flatten {
        inner: FlattenIndexed::new(items),
    }
}

/// Iterator returned by [`flatten`], [`Item::flatten`] and [`Suite::tests`].
#[derive(Clone, Debug)]
pub struct Flatten<'a> {
    inner: FlattenIndexed<'a>,
}

impl<'a> Iterator for Flatten<'a> {
    type Item = &'a Test;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, test)| test)
    }
}

/// Depth-first walk that also yields the [`TestPath`] of each leaf.
#[derive(Clone, Debug)]
pub struct FlattenIndexed<'a> {
    // One iterator per level; `prefix` holds the positions of the suites being walked, so
    // `stack.len() == prefix.len() + 1` while the walk is in progress.
    stack: Vec<Enumerate<slice::Iter<'a, Item>>>,
    prefix: TestPath,
}

impl<'a> FlattenIndexed<'a> {
    /// Starts a walk over `items`.
    pub fn new(items: &'a [Item]) -> Self {
        Self {
            stack: vec![items.iter().enumerate()],
            prefix: TestPath::new(),
        }
    }
}

impl<'a> Iterator for FlattenIndexed<'a> {
    type Item = (TestPath, &'a Test);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let level = self.stack.last_mut()?;
            match level.next() {
                Some((ix, Item::Test(test))) => {
                    let mut path = self.prefix.clone();
                    path.push(ix);
                    return Some((path, test));
                }
                Some((ix, Item::Suite(suite))) => {
                    self.prefix.push(ix);
                    self.stack.push(suite.items.iter().enumerate());
                }
                None => {
                    self.stack.pop();
                    self.prefix.pop();
                }
            }
        }
    }
}

/// Resolves a path produced by [`FlattenIndexed`] to the test it points at.
pub(crate) fn resolve<'a>(items: &'a [Item], path: &[usize]) -> Option<&'a Test> {
    let (&ix, rest) = path.split_first()?;
    match (items.get(ix)?, rest.is_empty()) {
        (Item::Test(test), true) => Some(test),
        (Item::Suite(suite), false) => resolve(&suite.items, rest),
        _ => None,
    }
}

/// Mutable version of [`resolve`].
pub(crate) fn resolve_mut<'a>(items: &'a mut [Item], path: &[usize]) -> Option<&'a mut Test> {
    let (&ix, rest) = path.split_first()?;
    match (items.get_mut(ix)?, rest.is_empty()) {
        (Item::Test(test), true) => Some(test),
        (Item::Suite(suite), false) => resolve_mut(&mut suite.items, rest),
        _ => None,
    }
}


#[cfg(test)]
mod tests {
    use super::{test_helpers::arb_items, *};
    use pretty_assertions::assert_eq;
    use test_strategy::proptest;

    fn suite(id: &str, items: impl IntoIterator<Item = Item>) -> Item {
        let mut suite = Suite::new(id);
        suite.add_items(items);
        Item::Suite(suite)
    }

    fn test(id: &str) -> Item {
        Item::Test(Test::new(id))
    }

    fn ids<'a>(tests: impl Iterator<Item = &'a Test>) -> Vec<&'a str> {
        tests.map(|test| test.id.as_str()).collect()
    }

    #[test]
    fn flatten_is_depth_first_in_child_order() {
        let items = vec![
            test("a"),
            suite(
                "s1",
                [
                    test("b"),
                    suite("s2", [test("c"), test("d")]),
                    suite("empty", []),
                    test("e"),
                ],
            ),
            test("f"),
        ];

        assert_eq!(ids(flatten(&items)), ["a", "b", "c", "d", "e", "f"]);
        assert_eq!(ids(items[1].flatten()), ["b", "c", "d", "e"]);
        assert_eq!(ids(items[0].flatten()), ["a"]);
    }

    #[test]
    fn flatten_is_restartable() {
        let items = vec![suite("s", [test("a"), test("b")])];
        let walk = flatten(&items);
        assert_eq!(ids(walk.clone()), ids(walk));
        assert_eq!(ids(flatten(&items)), ["a", "b"]);
    }

    #[test]
    fn paths_resolve_to_their_leaves() {
        let mut items = vec![
            test("a"),
            suite("s1", [suite("s2", [test("b")]), test("c")]),
        ];

        let paths: Vec<(Vec<usize>, String)> = FlattenIndexed::new(&items)
            .map(|(path, test)| (path.to_vec(), test.id.clone()))
            .collect();
        assert_eq!(
            paths,
            vec![
                (vec![0], "a".to_owned()),
                (vec![1, 0, 0], "b".to_owned()),
                (vec![1, 1], "c".to_owned()),
            ]
        );

        assert_eq!(resolve(&items, &[1, 0, 0]).map(|t| t.id.as_str()), Some("b"));
        assert_eq!(resolve(&items, &[1, 0]), None, "suite is not a leaf");
        assert_eq!(resolve(&items, &[0, 0]), None, "test has no children");
        assert_eq!(resolve(&items, &[5]), None);
        assert_eq!(resolve(&items, &[]), None);

        resolve_mut(&mut items, &[1, 1])
            .expect("path is valid")
            .set_status(TestStatus::Failure);
        assert_eq!(
            resolve(&items, &[1, 1]).map(|t| t.status),
            Some(TestStatus::Failure)
        );
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [
            TestStatus::NotRun,
            TestStatus::Success,
            TestStatus::Failure,
            TestStatus::Error,
            TestStatus::Disabled,
        ] {
            assert_eq!(status.to_static_str().parse::<TestStatus>(), Ok(status));
        }
        assert!("passed".parse::<TestStatus>().is_err());
    }

    #[proptest(cases = 128)]
    fn every_yielded_path_resolves(#[strategy(arb_items())] items: Vec<Item>) {
        let mut count = 0;
        for (path, test) in FlattenIndexed::new(&items) {
            assert_eq!(resolve(&items, &path), Some(test));
            count += 1;
        }
        assert_eq!(count, flatten(&items).count());
    }
}
