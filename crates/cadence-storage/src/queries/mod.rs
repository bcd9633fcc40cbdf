// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the durable and shared-state schemas.

pub mod directory;
pub mod followup;
pub mod state;
