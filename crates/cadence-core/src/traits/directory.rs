// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant and conversation lookup.

use async_trait::async_trait;

use crate::error::CadenceError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{Company, Conversation};

/// Resolves the entities a dispatch needs. Absent means deleted.
#[async_trait]
pub trait Directory: PluginAdapter {
    async fn resolve_conversation(&self, id: &str) -> Result<Option<Conversation>, CadenceError>;

    async fn resolve_company(&self, id: &str) -> Result<Option<Company>, CadenceError>;
}
