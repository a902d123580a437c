// Copyright (c) The live-run Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Live state for a single execution of a hierarchical test plan.
//!
//! A producer runs tests against a remote session and streams results back as events. Those
//! events are fed into a [`Run`](run::Run), which keeps the suite/test tree, an index from test
//! identifier to test, running counters, and derived progress figures. Consumers, such as a UI
//! refresh loop, poll the same run concurrently through a [`SharedRun`](run::SharedRun).
//!
//! For the basic flow:
//!
//! 1. Create a [`Run`](run::Run) and register it in a [`RunRegistry`](registry::RunRegistry).
//! 2. Spawn a [`RunDriver`](driver::RunDriver) that applies [`RunEvent`](events::RunEvent)s from
//!    the producer's channel.
//! 3. Poll the [`SharedRun`](run::SharedRun) from consumers, or take a
//!    [`RunSnapshot`](run::RunSnapshot) to read everything at once.

pub mod config;
pub mod counter;
pub mod driver;
pub mod errors;
pub mod events;
mod helpers;
pub mod item;
pub mod output;
pub mod registry;
pub mod run;
pub mod time;
