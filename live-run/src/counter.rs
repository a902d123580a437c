// Copyright (c) The live-run Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Running tallies of finished tests.

use serde::Serialize;
use std::fmt;

/// An outcome category tracked by a [`Counter`].
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub enum CounterCategory {
    /// Tests that were disabled and never ran.
    Disabled,

    /// Tests that passed.
    Success,

    /// Tests with a failed expectation.
    Failure,

    /// Tests that raised an unexpected error.
    Error,
}

impl CounterCategory {
    /// All categories, in the order they're reported by producers.
    pub const ALL: [Self; 4] = [Self::Disabled, Self::Success, Self::Failure, Self::Error];

    /// Returns the name of this category.
    pub fn to_static_str(self) -> &'static str {
        match self {
            CounterCategory::Disabled => "disabled",
            CounterCategory::Success => "success",
            CounterCategory::Failure => "failure",
            CounterCategory::Error => "error",
        }
    }
}

impl fmt::Display for CounterCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_static_str())
    }
}

/// A tally of the four disjoint outcome categories for completed tests.
///
/// Each category starts out unset. Unset is distinct from zero: it means no report for that
/// category has arrived yet, and the sum is only defined once every category has been reported.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct Counter {
    /// The number of disabled tests, if reported.
    pub disabled: Option<usize>,

    /// The number of successful tests, if reported.
    pub success: Option<usize>,

    /// The number of failed tests, if reported.
    pub failure: Option<usize>,

    /// The number of errored tests, if reported.
    pub error: Option<usize>,
}

impl Counter {
    /// Creates a new counter with every category unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one category, overwriting any previous value.
    ///
    /// Producers report running totals, so values only grow in practice. That isn't enforced.
    pub fn set(&mut self, category: CounterCategory, value: usize) -> &mut Self {
        *self.slot_mut(category) = Some(value);
        self
    }

    /// Returns the value of one category, or `None` if it hasn't been reported.
    pub fn get(&self, category: CounterCategory) -> Option<usize> {
        match category {
            CounterCategory::Disabled => self.disabled,
            CounterCategory::Success => self.success,
            CounterCategory::Failure => self.failure,
            CounterCategory::Error => self.error,
        }
    }

    /// Returns true if every category has been reported at least once.
    pub fn is_complete(&self) -> bool {
        CounterCategory::ALL
            .iter()
            .all(|&category| self.get(category).is_some())
    }

    /// Returns the sum of all four categories, or `None` if the counter isn't complete.
    pub fn sum(&self) -> Option<usize> {
        CounterCategory::ALL
            .iter()
            .try_fold(0usize, |acc, &category| {
                self.get(category).map(|n| acc.saturating_add(n))
            })
    }

    fn slot_mut(&mut self, category: CounterCategory) -> &mut Option<usize> {
        match category {
            CounterCategory::Disabled => &mut self.disabled,
            CounterCategory::Success => &mut self.success,
            CounterCategory::Failure => &mut self.failure,
            CounterCategory::Error => &mut self.error,
        }
    }
}
