// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring for the Cadence engagement scheduler.
//!
//! [`CadenceRuntime`] assembles storage, shared state, the lease, the
//! dispatch pool, and both halves of the scheduler, then runs the debounce
//! sweep and the follow-up poll until shutdown. [`Engagement`] is the
//! fire-and-forget entry point for inbound traffic.

pub mod engagement;
pub mod runtime;
pub mod shutdown;
pub mod tracking;

pub use engagement::{Engagement, InboundEvent};
pub use runtime::{open_state, CadenceRuntime, Components};
pub use shutdown::install_signal_handler;
pub use tracking::TrackingResponder;
