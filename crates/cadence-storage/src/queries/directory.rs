// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Company and conversation directory operations.

use cadence_core::types::{Company, Conversation, SupportMode};
use cadence_core::CadenceError;
use rusqlite::{params, OptionalExtension};

use crate::database::Database;
use crate::models::enum_column;

/// Insert or rename a company.
pub async fn upsert_company(db: &Database, company: &Company) -> Result<(), CadenceError> {
    let company = company.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO companies (id, name) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![company.id, company.name],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_company(db: &Database, id: &str) -> Result<Option<Company>, CadenceError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, name FROM companies WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Company {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert or update a conversation. The company must exist.
pub async fn upsert_conversation(
    db: &Database,
    conversation: &Conversation,
) -> Result<(), CadenceError> {
    let c = conversation.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO conversations (id, company_id, contact_name, phone_number, support_mode)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(id) DO UPDATE SET company_id = excluded.company_id,
                 contact_name = excluded.contact_name,
                 phone_number = excluded.phone_number,
                 support_mode = excluded.support_mode,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![
                    c.id,
                    c.company_id,
                    c.contact_name,
                    c.phone_number,
                    c.support_mode.to_string()
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, CadenceError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT id, company_id, contact_name, phone_number, support_mode
                 FROM conversations WHERE id = ?1",
                params![id],
                |row| {
                    Ok(Conversation {
                        id: row.get(0)?,
                        company_id: row.get(1)?,
                        contact_name: row.get(2)?,
                        phone_number: row.get(3)?,
                        support_mode: enum_column(row, 4)?,
                    })
                },
            )
            .optional()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Hand a conversation to a human agent or back to the responder.
///
/// Returns `false` if the conversation does not exist.
pub async fn set_support_mode(
    db: &Database,
    id: &str,
    mode: SupportMode,
) -> Result<bool, CadenceError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE conversations SET support_mode = ?2,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![id, mode.to_string()],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete a conversation. Returns whether a row was removed.
pub async fn delete_conversation(db: &Database, id: &str) -> Result<bool, CadenceError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute("DELETE FROM conversations WHERE id = ?1", params![id])?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
