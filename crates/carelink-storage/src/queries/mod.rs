// SPDX-FileCopyrightText: 2026 Carelink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. Each accepts `&Database` and runs through the single
//! background writer thread.

pub mod conversations;
pub mod messages;
pub mod parties;
