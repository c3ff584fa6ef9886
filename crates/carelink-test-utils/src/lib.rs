// SPDX-FileCopyrightText: 2026 Carelink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared test fixtures for Carelink integration testing.

pub mod harness;

pub use harness::TestHarness;
