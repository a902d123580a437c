// Copyright (c) The live-run Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The live state of a single test run.
//!
//! The main structure in this module is [`Run`]. A run is written to by a single producer and read
//! by any number of consumers; share it between them with a [`SharedRun`].

mod imp;
mod shared;

pub use imp::*;
pub use shared::*;
