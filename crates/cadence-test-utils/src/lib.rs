// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Cadence integration tests.
//!
//! # Components
//!
//! - [`MockResponder`] - Records every reply and follow-up instead of sending it
//! - [`MockDirectory`] - In-memory companies and conversations
//! - [`TestHarness`] - A fully assembled runtime over a temp database and a manual clock

pub mod fixtures;
pub mod harness;
pub mod mock_directory;
pub mod mock_responder;

pub use harness::TestHarness;
pub use mock_directory::MockDirectory;
pub use mock_responder::{MockResponder, SentMessage};
