// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes.

use std::path::Path;

use cadence_core::CadenceError;
use tracing::debug;

use crate::migrations;

/// Which migration set a database file carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// Directory plus follow-up configs and statuses.
    Durable,
    /// Debounce buffers, timers, active set, and leases.
    State,
}

/// A migrated SQLite database behind one tokio-rusqlite connection.
pub struct Database {
    conn: tokio_rusqlite::Connection,
}

/// Convert a tokio-rusqlite error into CadenceError::Storage.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> CadenceError {
    CadenceError::Storage {
        source: Box::new(e),
    }
}

impl Database {
    /// Open (creating if needed) a durable-schema database in WAL mode.
    pub async fn open(path: &str) -> Result<Self, CadenceError> {
        Self::open_schema(path, Schema::Durable, true).await
    }

    /// Open a database, apply PRAGMAs, and run the migrations of `schema`.
    pub async fn open_schema(
        path: &str,
        schema: Schema,
        wal_mode: bool,
    ) -> Result<Self, CadenceError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| CadenceError::Storage {
                source: Box::new(e),
            })?;
        }

        let conn = tokio_rusqlite::Connection::open(path)
            .await
            .map_err(|e| CadenceError::Storage {
                source: Box::new(e),
            })?;

        let journal = if wal_mode { "WAL" } else { "DELETE" };
        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute_batch(&format!(
                "PRAGMA journal_mode = {journal};
                 PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;
                 PRAGMA foreign_keys = ON;"
            ))?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;

        conn.call(move |conn| match schema {
            Schema::Durable => migrations::run_durable(conn),
            Schema::State => migrations::run_state(conn),
        })
        .await
        .map_err(|e| CadenceError::Storage {
            source: Box::new(e),
        })?;

        debug!(path, ?schema, "database opened and migrated");
        Ok(Self { conn })
    }

    /// The shared connection handle. Query modules go through `call()`.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    /// Checkpoint the WAL and close the connection.
    pub async fn close(self) -> Result<(), CadenceError> {
        checkpoint(&self.conn).await?;
        self.conn.close().await.map_err(map_tr_err)
    }
}

/// Run `PRAGMA wal_checkpoint(TRUNCATE)` on a connection.
pub(crate) async fn checkpoint(conn: &tokio_rusqlite::Connection) -> Result<(), CadenceError> {
    conn.call(|conn| -> Result<(), rusqlite::Error> {
        conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    })
    .await
    .map_err(map_tr_err)
}
