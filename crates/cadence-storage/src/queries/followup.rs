// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Follow-up config and status operations.
//!
//! Every status mutation is one statement (or one IMMEDIATE transaction)
//! keyed by conversation id, and bumps `version`.

use cadence_core::types::{
    ActivityUpdate, FollowUpConfig, FollowUpStatus, FollowUpStep, Schedule, StepSettlement,
};
use cadence_core::CadenceError;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};

use crate::database::Database;
use crate::models::{enum_column, fmt_ts, opt_enum_column, ts_column};

const STATUS_COLUMNS: &str = "s.conversation_id, s.company_id, s.last_message_at, s.last_direction,
    s.follow_up_count, s.last_follow_up_at, s.next_follow_up_at, s.paused, s.eligible, s.version";

fn status_from_row(row: &Row<'_>) -> rusqlite::Result<FollowUpStatus> {
    Ok(FollowUpStatus {
        conversation_id: row.get(0)?,
        company_id: row.get(1)?,
        last_message_at: ts_column(row, 2)?,
        last_direction: opt_enum_column(row, 3)?,
        follow_up_count: row.get(4)?,
        last_follow_up_at: ts_column(row, 5)?,
        next_follow_up_at: ts_column(row, 6)?,
        paused: row.get(7)?,
        eligible: row.get(8)?,
        version: row.get(9)?,
    })
}

fn read_status(conn: &Connection, conversation_id: &str) -> rusqlite::Result<Option<FollowUpStatus>> {
    conn.query_row(
        &format!("SELECT {STATUS_COLUMNS} FROM followup_status s WHERE s.conversation_id = ?1"),
        params![conversation_id],
        status_from_row,
    )
    .optional()
}

// --- Config ---

pub async fn get_config(
    db: &Database,
    company_id: &str,
) -> Result<Option<FollowUpConfig>, CadenceError> {
    let company_id = company_id.to_string();
    db.connection()
        .call(move |conn| {
            let config = conn
                .query_row(
                    "SELECT company_id, enabled, inactivity_minutes, trigger_on_inbound,
                            trigger_on_outbound, start_hour, end_hour, utc_offset_minutes
                     FROM followup_configs WHERE company_id = ?1",
                    params![company_id],
                    |row| {
                        Ok(FollowUpConfig {
                            company_id: row.get(0)?,
                            enabled: row.get(1)?,
                            inactivity_minutes: row.get(2)?,
                            trigger_on_inbound: row.get(3)?,
                            trigger_on_outbound: row.get(4)?,
                            start_hour: row.get(5)?,
                            end_hour: row.get(6)?,
                            utc_offset_minutes: row.get(7)?,
                            steps: Vec::new(),
                        })
                    },
                )
                .optional()?;

            let Some(mut config) = config else {
                return Ok(None);
            };

            let mut stmt = conn.prepare(
                "SELECT step_order, delay_minutes, kind, template_body, generation_prompt, active
                 FROM followup_steps WHERE company_id = ?1 ORDER BY step_order ASC",
            )?;
            let steps = stmt.query_map(params![config.company_id], |row| {
                Ok(FollowUpStep {
                    step_order: row.get(0)?,
                    delay_minutes: row.get(1)?,
                    kind: enum_column(row, 2)?,
                    template_body: row.get(3)?,
                    generation_prompt: row.get(4)?,
                    active: row.get(5)?,
                })
            })?;
            config.steps = steps.collect::<Result<Vec<_>, _>>()?;
            Ok(Some(config))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Replace a tenant's config row and its whole step list in one transaction.
pub async fn save_config(db: &Database, config: &FollowUpConfig) -> Result<(), CadenceError> {
    let config = config.clone();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "INSERT INTO followup_configs (company_id, enabled, inactivity_minutes,
                    trigger_on_inbound, trigger_on_outbound, start_hour, end_hour, utc_offset_minutes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(company_id) DO UPDATE SET enabled = excluded.enabled,
                    inactivity_minutes = excluded.inactivity_minutes,
                    trigger_on_inbound = excluded.trigger_on_inbound,
                    trigger_on_outbound = excluded.trigger_on_outbound,
                    start_hour = excluded.start_hour,
                    end_hour = excluded.end_hour,
                    utc_offset_minutes = excluded.utc_offset_minutes,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![
                    config.company_id,
                    config.enabled,
                    config.inactivity_minutes,
                    config.trigger_on_inbound,
                    config.trigger_on_outbound,
                    config.start_hour,
                    config.end_hour,
                    config.utc_offset_minutes,
                ],
            )?;
            tx.execute(
                "DELETE FROM followup_steps WHERE company_id = ?1",
                params![config.company_id],
            )?;
            {
                let mut insert = tx.prepare(
                    "INSERT INTO followup_steps (company_id, step_order, delay_minutes, kind,
                        template_body, generation_prompt, active)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )?;
                for step in &config.steps {
                    insert.execute(params![
                        config.company_id,
                        step.step_order,
                        step.delay_minutes,
                        step.kind.to_string(),
                        step.template_body,
                        step.generation_prompt,
                        step.active,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

// --- Status reads ---

pub async fn get_status(
    db: &Database,
    conversation_id: &str,
) -> Result<Option<FollowUpStatus>, CadenceError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| read_status(conn, &conversation_id))
        .await
        .map_err(crate::database::map_tr_err)
}

/// All status rows of a tenant, soonest due first, unscheduled rows last.
pub async fn list_statuses(
    db: &Database,
    company_id: &str,
) -> Result<Vec<FollowUpStatus>, CadenceError> {
    let company_id = company_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {STATUS_COLUMNS} FROM followup_status s
                 WHERE s.company_id = ?1
                 ORDER BY s.next_follow_up_at IS NULL, s.next_follow_up_at ASC, s.conversation_id ASC"
            ))?;
            let rows = stmt.query_map(params![company_id], status_from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Due candidates: scheduled at or before `now`, unpaused, eligible, and
/// belonging to a tenant whose config is enabled. Oldest-due first.
pub async fn due_statuses(
    db: &Database,
    now: DateTime<Utc>,
    limit: usize,
) -> Result<Vec<FollowUpStatus>, CadenceError> {
    let now = fmt_ts(now);
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {STATUS_COLUMNS} FROM followup_status s
                 JOIN followup_configs c ON c.company_id = s.company_id
                 WHERE c.enabled = 1
                   AND s.paused = 0
                   AND s.eligible = 1
                   AND s.next_follow_up_at IS NOT NULL
                   AND s.next_follow_up_at <= ?1
                 ORDER BY s.next_follow_up_at ASC
                 LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![now, limit], status_from_row)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

// --- Status writes ---

/// Upsert the status row for one tracked activity and return it.
pub async fn record_activity(
    db: &Database,
    update: &ActivityUpdate,
) -> Result<FollowUpStatus, CadenceError> {
    let update = update.clone();
    let schedule_clause = match update.schedule {
        Schedule::Touch => "",
        Schedule::Arm { .. } => {
            ", follow_up_count = 0, next_follow_up_at = excluded.next_follow_up_at, eligible = 1"
        }
        Schedule::Cancel => ", next_follow_up_at = NULL, eligible = 0",
        Schedule::Idle => ", next_follow_up_at = NULL",
    };
    let (insert_next, insert_eligible) = match update.schedule {
        Schedule::Arm { next } => (Some(fmt_ts(next)), true),
        Schedule::Cancel => (None, false),
        Schedule::Touch | Schedule::Idle => (None, true),
    };
    let sql = format!(
        "INSERT INTO followup_status (conversation_id, company_id, last_message_at,
            last_direction, next_follow_up_at, eligible)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(conversation_id) DO UPDATE SET company_id = excluded.company_id,
            last_message_at = excluded.last_message_at,
            last_direction = excluded.last_direction{schedule_clause},
            version = version + 1,
            updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')"
    );

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                &sql,
                params![
                    update.conversation_id,
                    update.company_id,
                    fmt_ts(update.at),
                    update.direction.to_string(),
                    insert_next,
                    insert_eligible,
                ],
            )?;
            let status = read_status(&tx, &update.conversation_id)?
                .ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            tx.commit()?;
            Ok(status)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Set the paused flag; the row is untouched when the flag already matches.
pub async fn set_paused(
    db: &Database,
    conversation_id: &str,
    paused: bool,
) -> Result<Option<FollowUpStatus>, CadenceError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "UPDATE followup_status SET paused = ?2, version = version + 1,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE conversation_id = ?1 AND paused != ?2",
                params![conversation_id, paused],
            )?;
            let status = read_status(&tx, &conversation_id)?;
            tx.commit()?;
            Ok(status)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Restart the cadence of a conversation.
pub async fn reset_status(
    db: &Database,
    conversation_id: &str,
) -> Result<Option<FollowUpStatus>, CadenceError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            tx.execute(
                "UPDATE followup_status SET follow_up_count = 0, last_follow_up_at = NULL,
                    next_follow_up_at = NULL, eligible = 1, paused = 0,
                    version = version + 1,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE conversation_id = ?1",
                params![conversation_id],
            )?;
            let status = read_status(&tx, &conversation_id)?;
            tx.commit()?;
            Ok(status)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Write the mutable fields of `status` iff the stored version still equals
/// `status.version`.
pub async fn compare_and_set_status(
    db: &Database,
    status: &FollowUpStatus,
) -> Result<bool, CadenceError> {
    let status = status.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE followup_status SET follow_up_count = ?2,
                    last_follow_up_at = ?3,
                    next_follow_up_at = ?4,
                    paused = ?5,
                    eligible = ?6,
                    version = version + 1,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE conversation_id = ?1 AND version = ?7",
                params![
                    status.conversation_id,
                    status.follow_up_count,
                    status.last_follow_up_at.map(fmt_ts),
                    status.next_follow_up_at.map(fmt_ts),
                    status.paused,
                    status.eligible,
                    status.version,
                ],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Write a settlement iff the row still holds the claim it was taken for.
pub async fn settle_claim(
    db: &Database,
    settlement: &StepSettlement,
) -> Result<bool, CadenceError> {
    let settlement = settlement.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE followup_status SET follow_up_count = ?2,
                    last_follow_up_at = ?3,
                    next_follow_up_at = ?4,
                    eligible = ?5,
                    version = version + 1,
                    updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE conversation_id = ?1
                   AND follow_up_count = ?6
                   AND next_follow_up_at IS NULL
                   AND eligible = 1",
                params![
                    settlement.conversation_id,
                    settlement.follow_up_count,
                    settlement.last_follow_up_at.map(fmt_ts),
                    settlement.next_follow_up_at.map(fmt_ts),
                    settlement.eligible,
                    settlement.claimed_count,
                ],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_core::types::{Direction, StepKind};
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap()
    }

    fn config(company: &str, enabled: bool) -> FollowUpConfig {
        let mut config = FollowUpConfig::defaults_for(company);
        config.enabled = enabled;
        config.steps = vec![
            FollowUpStep {
                step_order: 1,
                delay_minutes: 60,
                kind: StepKind::Template,
                template_body: Some("Oi {lead_name}!".into()),
                generation_prompt: None,
                active: true,
            },
            FollowUpStep {
                step_order: 2,
                delay_minutes: 120,
                kind: StepKind::Generated,
                template_body: None,
                generation_prompt: None,
                active: false,
            },
        ];
        config
    }

    fn arm(conversation: &str, company: &str, next: DateTime<Utc>) -> ActivityUpdate {
        ActivityUpdate {
            conversation_id: conversation.into(),
            company_id: company.into(),
            at: t0(),
            direction: Direction::Outbound,
            schedule: Schedule::Arm { next },
        }
    }

    #[tokio::test]
    async fn config_round_trip_replaces_steps() {
        let (db, _dir) = setup_db().await;
        assert!(get_config(&db, "co-1").await.unwrap().is_none());

        let mut cfg = config("co-1", true);
        save_config(&db, &cfg).await.unwrap();
        assert_eq!(get_config(&db, "co-1").await.unwrap(), Some(cfg.clone()));

        cfg.steps.truncate(1);
        cfg.start_hour = 9;
        save_config(&db, &cfg).await.unwrap();
        let loaded = get_config(&db, "co-1").await.unwrap().unwrap();
        assert_eq!(loaded.steps.len(), 1);
        assert_eq!(loaded.start_hour, 9);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn record_activity_schedules() {
        let (db, _dir) = setup_db().await;
        let next = t0() + Duration::minutes(60);

        let armed = record_activity(&db, &arm("conv-1", "co-1", next)).await.unwrap();
        assert_eq!(armed.next_follow_up_at, Some(next));
        assert!(armed.eligible);
        assert_eq!(armed.last_direction, Some(Direction::Outbound));
        assert_eq!(armed.version, 0);

        let cancelled = record_activity(
            &db,
            &ActivityUpdate {
                direction: Direction::Inbound,
                schedule: Schedule::Cancel,
                ..arm("conv-1", "co-1", next)
            },
        )
        .await
        .unwrap();
        assert!(!cancelled.eligible);
        assert!(cancelled.next_follow_up_at.is_none());
        assert_eq!(cancelled.version, 1);

        let touched = record_activity(
            &db,
            &ActivityUpdate {
                schedule: Schedule::Touch,
                ..arm("conv-1", "co-1", next)
            },
        )
        .await
        .unwrap();
        assert!(!touched.eligible, "touch leaves eligibility alone");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn due_query_filters_and_orders() {
        let (db, _dir) = setup_db().await;
        save_config(&db, &config("co-on", true)).await.unwrap();
        save_config(&db, &config("co-off", false)).await.unwrap();

        let now = t0() + Duration::hours(3);
        record_activity(&db, &arm("late", "co-on", t0() + Duration::hours(2))).await.unwrap();
        record_activity(&db, &arm("early", "co-on", t0() + Duration::hours(1))).await.unwrap();
        record_activity(&db, &arm("future", "co-on", now + Duration::minutes(1))).await.unwrap();
        record_activity(&db, &arm("disabled", "co-off", t0())).await.unwrap();
        record_activity(&db, &arm("paused", "co-on", t0())).await.unwrap();
        set_paused(&db, "paused", true).await.unwrap();

        let due = due_statuses(&db, now, 10).await.unwrap();
        let ids: Vec<&str> = due.iter().map(|s| s.conversation_id.as_str()).collect();
        assert_eq!(ids, vec!["early", "late"]);

        let limited = due_statuses(&db, now, 1).await.unwrap();
        assert_eq!(limited.len(), 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn set_paused_is_idempotent() {
        let (db, _dir) = setup_db().await;
        record_activity(&db, &arm("conv-1", "co-1", t0())).await.unwrap();

        let once = set_paused(&db, "conv-1", true).await.unwrap().unwrap();
        let twice = set_paused(&db, "conv-1", true).await.unwrap().unwrap();
        assert_eq!(once, twice);
        assert!(set_paused(&db, "missing", true).await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn compare_and_set_rejects_stale_version() {
        let (db, _dir) = setup_db().await;
        let status = record_activity(&db, &arm("conv-1", "co-1", t0())).await.unwrap();

        let mut advanced = status.clone();
        advanced.follow_up_count = 1;
        advanced.last_follow_up_at = Some(t0());
        assert!(compare_and_set_status(&db, &advanced).await.unwrap());

        // Same expected version again: the row moved on.
        assert!(!compare_and_set_status(&db, &advanced).await.unwrap());

        let stored = get_status(&db, "conv-1").await.unwrap().unwrap();
        assert_eq!(stored.follow_up_count, 1);
        assert_eq!(stored.version, status.version + 1);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn settle_claim_survives_version_bumps_but_not_rearm() {
        let (db, _dir) = setup_db().await;
        let armed = record_activity(&db, &arm("conv-1", "co-1", t0())).await.unwrap();
        let claimed = FollowUpStatus {
            next_follow_up_at: None,
            ..armed
        };
        assert!(compare_and_set_status(&db, &claimed).await.unwrap());

        // An operator touch and a pause both bump the version.
        record_activity(
            &db,
            &ActivityUpdate {
                schedule: Schedule::Touch,
                ..arm("conv-1", "co-1", t0())
            },
        )
        .await
        .unwrap();
        set_paused(&db, "conv-1", true).await.unwrap();

        let settlement = StepSettlement {
            conversation_id: "conv-1".into(),
            claimed_count: 0,
            follow_up_count: 1,
            last_follow_up_at: Some(t0()),
            next_follow_up_at: Some(t0() + Duration::minutes(120)),
            eligible: true,
        };
        assert!(settle_claim(&db, &settlement).await.unwrap());
        let settled = get_status(&db, "conv-1").await.unwrap().unwrap();
        assert_eq!(settled.follow_up_count, 1);
        assert_eq!(settled.next_follow_up_at, Some(t0() + Duration::minutes(120)));
        assert!(settled.paused, "pause is kept");

        // The claim is gone once settled.
        assert!(!settle_claim(&db, &settlement).await.unwrap());

        // A re-armed row no longer holds a claim.
        record_activity(&db, &arm("conv-2", "co-1", t0())).await.unwrap();
        let rearmed = StepSettlement {
            conversation_id: "conv-2".into(),
            ..settlement
        };
        assert!(!settle_claim(&db, &rearmed).await.unwrap());
        assert_eq!(
            get_status(&db, "conv-2").await.unwrap().unwrap().follow_up_count,
            0
        );

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reset_restarts_cadence() {
        let (db, _dir) = setup_db().await;
        let mut status = record_activity(&db, &arm("conv-1", "co-1", t0())).await.unwrap();
        status.follow_up_count = 2;
        status.eligible = false;
        status.paused = true;
        compare_and_set_status(&db, &status).await.unwrap();

        let reset = reset_status(&db, "conv-1").await.unwrap().unwrap();
        assert_eq!(reset.follow_up_count, 0);
        assert!(reset.eligible);
        assert!(!reset.paused);
        assert!(reset.next_follow_up_at.is_none());
        assert!(reset.last_follow_up_at.is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_statuses_puts_unscheduled_last() {
        let (db, _dir) = setup_db().await;
        record_activity(&db, &arm("b", "co-1", t0() + Duration::hours(2))).await.unwrap();
        record_activity(&db, &arm("a", "co-1", t0() + Duration::hours(1))).await.unwrap();
        record_activity(
            &db,
            &ActivityUpdate {
                schedule: Schedule::Idle,
                ..arm("c", "co-1", t0())
            },
        )
        .await
        .unwrap();
        record_activity(&db, &arm("other", "co-2", t0())).await.unwrap();

        let ids: Vec<String> = list_statuses(&db, "co-1")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.conversation_id)
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        db.close().await.unwrap();
    }
}
