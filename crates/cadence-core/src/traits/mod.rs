// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions for the pluggable collaborators of the scheduler.
//!
//! All adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod directory;
pub mod followup;
pub mod lock;
pub mod responder;
pub mod state;

pub use adapter::PluginAdapter;
pub use directory::Directory;
pub use followup::FollowUpStore;
pub use lock::ConversationLock;
pub use responder::Responder;
pub use state::StateStore;
