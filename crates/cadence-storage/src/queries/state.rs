// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Debounce buffer, active set, and lease operations on the state schema.

use cadence_core::types::{PendingBuffer, PendingResponse};
use cadence_core::CadenceError;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, TransactionBehavior};

use crate::database::Database;
use crate::models::{from_millis, to_millis};

/// Append a fragment, overwrite metadata and timer, and mark the id active.
pub async fn append_fragment(
    db: &Database,
    pending: &PendingResponse,
    text: &str,
    at: DateTime<Utc>,
) -> Result<(), CadenceError> {
    let pending = pending.clone();
    let text = text.to_string();
    let at_ms = to_millis(at);
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "INSERT INTO debounce_fragments (conversation_id, fragment, appended_at_ms)
                 VALUES (?1, ?2, ?3)",
                params![pending.conversation_id, text, at_ms],
            )?;
            tx.execute(
                "INSERT INTO debounce_pending (conversation_id, company_id, lead_name,
                    last_activity_ms, first_fragment_ms)
                 VALUES (?1, ?2, ?3, ?4, ?4)
                 ON CONFLICT(conversation_id) DO UPDATE SET company_id = excluded.company_id,
                    lead_name = excluded.lead_name,
                    last_activity_ms = excluded.last_activity_ms",
                params![pending.conversation_id, pending.company_id, pending.lead_name, at_ms],
            )?;
            tx.execute(
                "INSERT OR IGNORE INTO debounce_active (conversation_id) VALUES (?1)",
                params![pending.conversation_id],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn active_ids(db: &Database) -> Result<Vec<String>, CadenceError> {
    db.connection()
        .call(|conn| {
            let mut stmt =
                conn.prepare("SELECT conversation_id FROM debounce_active ORDER BY conversation_id")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn last_activity(
    db: &Database,
    conversation_id: &str,
) -> Result<Option<DateTime<Utc>>, CadenceError> {
    let conversation_id = conversation_id.to_string();
    let ms = db
        .connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT last_activity_ms FROM debounce_pending WHERE conversation_id = ?1",
                params![conversation_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(ms.and_then(from_millis))
}

pub async fn remove_active(db: &Database, conversation_id: &str) -> Result<bool, CadenceError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let removed = conn.execute(
                "DELETE FROM debounce_active WHERE conversation_id = ?1",
                params![conversation_id],
            )?;
            Ok(removed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Read and delete fragments, metadata, and timer in one transaction.
///
/// Active-set membership is left alone.
pub async fn take_pending(
    db: &Database,
    conversation_id: &str,
) -> Result<PendingBuffer, CadenceError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let fragments = {
                let mut stmt = tx.prepare(
                    "SELECT fragment FROM debounce_fragments
                     WHERE conversation_id = ?1 ORDER BY id ASC",
                )?;
                let rows = stmt.query_map(params![conversation_id], |row| row.get(0))?;
                rows.collect::<Result<Vec<String>, _>>()?
            };
            let metadata = tx
                .query_row(
                    "SELECT conversation_id, company_id, lead_name
                     FROM debounce_pending WHERE conversation_id = ?1",
                    params![conversation_id],
                    |row| {
                        Ok(PendingResponse {
                            conversation_id: row.get(0)?,
                            company_id: row.get(1)?,
                            lead_name: row.get(2)?,
                        })
                    },
                )
                .optional()?;
            tx.execute(
                "DELETE FROM debounce_fragments WHERE conversation_id = ?1",
                params![conversation_id],
            )?;
            tx.execute(
                "DELETE FROM debounce_pending WHERE conversation_id = ?1",
                params![conversation_id],
            )?;
            tx.commit()?;
            Ok(PendingBuffer {
                fragments,
                metadata,
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn clear(db: &Database, conversation_id: &str) -> Result<(), CadenceError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            for table in ["debounce_fragments", "debounce_pending", "debounce_active"] {
                tx.execute(
                    &format!("DELETE FROM {table} WHERE conversation_id = ?1"),
                    params![conversation_id],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Take the lease if it is absent or expired at `now`.
pub async fn try_lock(
    db: &Database,
    conversation_id: &str,
    owner: &str,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<bool, CadenceError> {
    let conversation_id = conversation_id.to_string();
    let owner = owner.to_string();
    let expires_ms = to_millis(expires_at);
    let now_ms = to_millis(now);
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "INSERT INTO conversation_leases (conversation_id, owner, expires_at_ms)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(conversation_id) DO UPDATE SET owner = excluded.owner,
                    expires_at_ms = excluded.expires_at_ms
                 WHERE conversation_leases.expires_at_ms <= ?4",
                params![conversation_id, owner, expires_ms, now_ms],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Release the lease only if `owner` still holds it.
pub async fn unlock(db: &Database, conversation_id: &str, owner: &str) -> Result<(), CadenceError> {
    let conversation_id = conversation_id.to_string();
    let owner = owner.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM conversation_leases WHERE conversation_id = ?1 AND owner = ?2",
                params![conversation_id, owner],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
