// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Directory, follow-up, and ingestion subcommands.
//!
//! Everything prints JSON on stdout so the output can be piped.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use serde::Serialize;

use cadence_config::CadenceConfig;
use cadence_core::types::{Company, Conversation, FollowUpConfig, FollowUpStatus, SupportMode};
use cadence_core::{CadenceError, SystemClock};
use cadence_engine::InboundEvent;
use cadence_followup::FollowUpTracker;
use cadence_storage::SqliteStorage;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CadenceError> {
    let out = serde_json::to_string_pretty(value)
        .map_err(|e| CadenceError::Internal(format!("failed to encode output: {e}")))?;
    println!("{out}");
    Ok(())
}

pub fn print_status(
    conversation_id: &str,
    status: Option<FollowUpStatus>,
) -> Result<(), CadenceError> {
    match status {
        Some(status) => print_json(&status),
        None => Err(CadenceError::not_found("follow-up status", conversation_id)),
    }
}

pub async fn open_storage(config: &CadenceConfig) -> Result<Arc<SqliteStorage>, CadenceError> {
    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    Ok(storage)
}

pub async fn open_tracker(config: &CadenceConfig) -> Result<FollowUpTracker, CadenceError> {
    let storage = open_storage(config).await?;
    Ok(FollowUpTracker::new(storage, Arc::new(SystemClock)))
}

pub async fn add_company(storage: &SqliteStorage, id: String, name: String) -> Result<(), CadenceError> {
    let company = Company { id, name };
    storage.upsert_company(&company).await?;
    print_json(&company)
}

pub async fn add_conversation(
    storage: &SqliteStorage,
    id: String,
    company_id: String,
    contact_name: Option<String>,
    phone_number: Option<String>,
) -> Result<(), CadenceError> {
    let conversation = Conversation {
        id,
        company_id,
        contact_name,
        phone_number,
        support_mode: SupportMode::Ai,
    };
    storage.upsert_conversation(&conversation).await?;
    print_json(&conversation)
}

pub async fn set_support_mode(
    storage: &SqliteStorage,
    id: &str,
    mode: &str,
) -> Result<(), CadenceError> {
    let mode = SupportMode::from_str(mode).map_err(|_| {
        CadenceError::Validation(format!("unknown support mode '{mode}', expected 'ai' or 'human'"))
    })?;
    if !storage.set_support_mode(id, mode).await? {
        return Err(CadenceError::not_found("conversation", id));
    }
    print_json(&serde_json::json!({ "conversation_id": id, "support_mode": mode }))
}

/// Buffer one contact message. With debouncing on, a running `serve`
/// sharing the state database flushes it.
pub async fn ingest(config: &CadenceConfig, event: InboundEvent) -> Result<(), CadenceError> {
    let runtime = crate::serve::build_runtime(config.clone()).await?;
    runtime.engagement().ingest(&event).await;
    runtime.pool().drain().await;
    print_json(&serde_json::json!({
        "conversation_id": event.conversation_id,
        "buffered": config.debounce.enabled,
    }))
}

/// Parse a follow-up config from `.json`, or TOML for any other extension.
pub fn read_follow_up_config(path: &Path) -> Result<FollowUpConfig, CadenceError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CadenceError::Config(format!("failed to read {}: {e}", path.display()))
    })?;
    parse_follow_up_config(&content, path.extension().is_some_and(|ext| ext == "json"))
        .map_err(|e| CadenceError::Config(format!("invalid follow-up config {}: {e}", path.display())))
}

fn parse_follow_up_config(content: &str, json: bool) -> Result<FollowUpConfig, String> {
    if json {
        serde_json::from_str(content).map_err(|e| e.to_string())
    } else {
        toml::from_str(content).map_err(|e| e.to_string())
    }
}
