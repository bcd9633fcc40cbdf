// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Debounce aggregator for the Cadence engagement scheduler.
//!
//! Contacts often split one thought over several chat bubbles. Fragments
//! are buffered per conversation and, once the conversation has been quiet
//! for the configured period, merged into a single text and answered once.

pub mod aggregator;
pub mod merge;

pub use aggregator::{DebounceAggregator, FlushOutcome};
pub use merge::merge_fragments;
