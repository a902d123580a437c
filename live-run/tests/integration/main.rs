// Copyright (c) The live-run Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

mod fixtures;
mod producer_consumer;
mod scenarios;
