// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Embedded database migrations using refinery.
//!
//! SQL migration files are compiled into the binary at build time via
//! `embed_migrations!`. The durable and shared-state schemas are separate
//! sets with their own history tables, so both can run against one file.

mod durable {
    use refinery::embed_migrations;
    embed_migrations!("migrations/durable");
}

mod state {
    use refinery::embed_migrations;
    embed_migrations!("migrations/state");
}

const DURABLE_HISTORY_TABLE: &str = "cadence_schema_history";
const STATE_HISTORY_TABLE: &str = "cadence_state_schema_history";

/// Run pending durable-schema migrations (directory, follow-up config and status).
pub fn run_durable(conn: &mut rusqlite::Connection) -> Result<(), refinery::Error> {
    durable::migrations::runner()
        .set_migration_table_name(DURABLE_HISTORY_TABLE)
        .run(conn)?;
    Ok(())
}

/// Run pending shared-state migrations (buffers, timers, active set, leases).
pub fn run_state(conn: &mut rusqlite::Connection) -> Result<(), refinery::Error> {
    state::migrations::runner()
        .set_migration_table_name(STATE_HISTORY_TABLE)
        .run(conn)?;
    Ok(())
}
