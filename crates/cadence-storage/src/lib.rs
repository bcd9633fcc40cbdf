// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence and shared state stores for the Cadence scheduler.
//!
//! Provides WAL-mode SQLite storage with embedded migrations and a
//! single-writer concurrency model via `tokio-rusqlite`:
//!
//! - [`SqliteStorage`]: durable follow-up configs, statuses, and the
//!   company/conversation directory.
//! - [`SqliteStateStore`]: debounce buffers, timers, the active set, and
//!   conversation leases, shareable between processes through one file.
//! - [`MemoryStateStore`]: the same state in process memory, for a single
//!   instance.

pub mod adapter;
pub mod database;
pub mod memory;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod state;

pub use adapter::SqliteStorage;
pub use database::{Database, Schema};
pub use memory::MemoryStateStore;
pub use state::SqliteStateStore;
