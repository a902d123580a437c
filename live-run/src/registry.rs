// Copyright (c) The live-run Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routing producer events to the run they belong to.

use crate::{
    errors::{RouteError, UnknownReporterId},
    events::RunEvent,
    run::{Run, SharedRun},
};
use indexmap::IndexMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

/// The set of active runs, keyed by reporter ID.
///
/// Pass a registry to producers and consumers explicitly; there is no global one.
#[derive(Debug, Default)]
pub struct RunRegistry {
    runs: Mutex<IndexMap<String, SharedRun>>,
}

impl RunRegistry {
    /// Creates a new, empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a run under its reporter ID and returns a shared handle to it.
    ///
    /// A run previously registered under the same reporter ID is replaced.
    pub fn insert(&self, run: Run) -> SharedRun {
        let reporter_id = run.reporter_id().to_owned();
        let shared = SharedRun::new(run);
        if self
            .lock()
            .insert(reporter_id.clone(), shared.clone())
            .is_some()
        {
            debug!(%reporter_id, "replaced registered run");
        }
        shared
    }

    /// Returns the run registered under `reporter_id`.
    pub fn get(&self, reporter_id: &str) -> Option<SharedRun> {
        self.lock().get(reporter_id).cloned()
    }

    /// Unregisters and returns the run registered under `reporter_id`.
    pub fn remove(&self, reporter_id: &str) -> Option<SharedRun> {
        self.lock().shift_remove(reporter_id)
    }

    /// Applies `event` to the run registered under `reporter_id`.
    ///
    /// The registry lock is not held while the event is applied.
    pub fn route(&self, reporter_id: &str, event: RunEvent) -> Result<(), RouteError> {
        let run = self
            .get(reporter_id)
            .ok_or_else(|| UnknownReporterId::new(reporter_id))?;
        run.apply(event)?;
        Ok(())
    }

    /// Returns the number of registered runs.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns true if no runs are registered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns the reporter IDs of registered runs, in registration order.
    pub fn reporter_ids(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<String, SharedRun>> {
        self.runs.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::RunStatus;

    #[test]
    fn routes_by_reporter_id() {
        let registry = RunRegistry::new();
        let first = registry.insert(Run::new("r1", None, vec![]));
        let second = registry.insert(Run::new("r2", None, vec![]));
        assert_eq!(registry.reporter_ids(), ["r1", "r2"]);

        registry
            .route(
                "r2",
                RunEvent::RunStarted {
                    start_time: "2019-05-01T14:22:05.123".to_owned(),
                },
            )
            .expect("r2 is registered");
        assert_eq!(first.status(), RunStatus::Pending);
        assert_eq!(second.status(), RunStatus::Running);

        let err = registry
            .route("r3", RunEvent::InfoEmitted { count: 1 })
            .expect_err("r3 is not registered");
        assert!(matches!(err, RouteError::UnknownReporterId(e) if e.reporter_id() == "r3"));
    }

    #[test]
    fn remove_unregisters() {
        let registry = RunRegistry::new();
        registry.insert(Run::new("r1", None, vec![]));
        assert_eq!(registry.len(), 1);

        let removed = registry.remove("r1").expect("r1 is registered");
        assert_eq!(removed.reporter_id(), "r1");
        assert!(registry.is_empty());
        assert!(registry.get("r1").is_none());
    }
}
