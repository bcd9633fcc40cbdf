// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Follow-up half of the Cadence engagement scheduler.
//!
//! - [`FollowUpTracker`] keeps each conversation's status current as
//!   messages flow and exposes the operator controls.
//! - [`FollowUpScheduler`] polls for due conversations and sends the next
//!   step of the tenant's cadence, inside the business-hour window.

pub mod scheduler;
pub mod template;
pub mod tracker;
pub mod validation;
pub mod window;

pub use scheduler::{DispatchOutcome, FollowUpScheduler};
pub use tracker::{FollowUpStatusView, FollowUpTracker};
pub use validation::validate_follow_up_config;
pub use window::BusinessWindow;
