// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across adapter traits and the Cadence scheduler.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the type of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    StateStore,
    FollowUpStore,
    Directory,
    Responder,
}

// --- Directory types ---

/// Who is currently answering a conversation.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SupportMode {
    /// The automated responder handles replies.
    #[default]
    Ai,
    /// A human agent has taken over; no automated follow-ups are sent.
    Human,
}

/// A tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: String,
    pub name: String,
}

/// A messaging conversation with one contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub company_id: String,
    pub contact_name: Option<String>,
    pub phone_number: Option<String>,
    #[serde(default)]
    pub support_mode: SupportMode,
}

impl Conversation {
    /// The contact's display name, or `fallback` when unknown or blank.
    pub fn lead_name(&self, fallback: &str) -> String {
        match self.contact_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => fallback.to_string(),
        }
    }
}

// --- Debounce types ---

/// Snapshot captured when buffering starts, read once at flush time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingResponse {
    pub conversation_id: String,
    pub company_id: String,
    pub lead_name: String,
}

/// Everything buffered for one conversation, as returned by a get-and-clear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingBuffer {
    /// Fragments in arrival order.
    pub fragments: Vec<String>,
    pub metadata: Option<PendingResponse>,
}

impl PendingBuffer {
    /// A buffer is flushable only with both fragments and metadata present.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty() || self.metadata.is_none()
    }
}

// --- Follow-up types ---

/// Direction of the last tracked message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Where a tracked message came from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivityOrigin {
    /// The contact wrote to us.
    Contact,
    /// The automated responder replied.
    Responder,
    /// A human operator replied.
    Operator,
    /// A follow-up step was sent.
    FollowUp,
}

impl ActivityOrigin {
    pub fn direction(self) -> Direction {
        match self {
            ActivityOrigin::Contact => Direction::Inbound,
            _ => Direction::Outbound,
        }
    }

    /// Whether this origin consults the config triggers at all.
    pub fn is_triggering(self) -> bool {
        matches!(self, ActivityOrigin::Contact | ActivityOrigin::Responder)
    }
}

/// One tracked message event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEvent {
    pub conversation_id: String,
    pub company_id: String,
    pub origin: ActivityOrigin,
    pub at: DateTime<Utc>,
}

/// How a tracked activity changes the schedule of a status row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Only refresh the last-message fields.
    Touch,
    /// Restart the cadence: count 0, eligible, due at `next`.
    Arm { next: DateTime<Utc> },
    /// The activity supersedes any pending nudge: not eligible, nothing due.
    Cancel,
    /// Nothing due, eligibility untouched.
    Idle,
}

/// A single atomic upsert of a status row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityUpdate {
    pub conversation_id: String,
    pub company_id: String,
    pub at: DateTime<Utc>,
    pub direction: Direction,
    pub schedule: Schedule,
}

/// The outcome written over a claimed step.
///
/// A dispatch claims its step by clearing `next_follow_up_at` before the
/// send. The settlement lands only while the row still shows that claim,
/// whatever other writes bumped the version meanwhile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepSettlement {
    pub conversation_id: String,
    /// `follow_up_count` at the time of the claim.
    pub claimed_count: u32,
    pub follow_up_count: u32,
    pub last_follow_up_at: Option<DateTime<Utc>>,
    pub next_follow_up_at: Option<DateTime<Utc>>,
    pub eligible: bool,
}

/// How a step's outbound text is produced.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    /// Fixed text with placeholders.
    Template,
    /// A prompt handed to the content generator.
    Generated,
}

/// One ordered step of a tenant's cadence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FollowUpStep {
    pub step_order: u32,
    /// Delay from the previous step, or from the last message for the first step.
    pub delay_minutes: i64,
    pub kind: StepKind,
    #[serde(default)]
    pub template_body: Option<String>,
    #[serde(default)]
    pub generation_prompt: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl FollowUpStep {
    pub fn delay(&self) -> Duration {
        Duration::minutes(self.delay_minutes)
    }
}

fn default_true() -> bool {
    true
}

/// Per-tenant follow-up policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FollowUpConfig {
    pub company_id: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_inactivity_minutes")]
    pub inactivity_minutes: i64,
    #[serde(default = "default_true")]
    pub trigger_on_inbound: bool,
    #[serde(default = "default_true")]
    pub trigger_on_outbound: bool,
    #[serde(default = "default_start_hour")]
    pub start_hour: u8,
    #[serde(default = "default_end_hour")]
    pub end_hour: u8,
    /// Tenant local time as an offset from UTC.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[serde(default)]
    pub steps: Vec<FollowUpStep>,
}

fn default_inactivity_minutes() -> i64 {
    1440
}

fn default_start_hour() -> u8 {
    8
}

fn default_end_hour() -> u8 {
    22
}

impl FollowUpConfig {
    /// The policy a tenant has before anyone saved one: disabled, no steps.
    pub fn defaults_for(company_id: &str) -> Self {
        Self {
            company_id: company_id.to_string(),
            enabled: false,
            inactivity_minutes: default_inactivity_minutes(),
            trigger_on_inbound: true,
            trigger_on_outbound: true,
            start_hour: default_start_hour(),
            end_hour: default_end_hour(),
            utc_offset_minutes: 0,
            steps: Vec::new(),
        }
    }

    /// Active steps in `step_order`. Indexing by follow-up count addresses this list.
    pub fn active_steps(&self) -> Vec<&FollowUpStep> {
        let mut steps: Vec<&FollowUpStep> = self.steps.iter().filter(|s| s.active).collect();
        steps.sort_by_key(|s| s.step_order);
        steps
    }

    /// Delay before the first nudge after the cadence is (re)armed.
    pub fn first_delay(&self) -> Duration {
        self.active_steps()
            .first()
            .map(|s| s.delay())
            .unwrap_or_else(|| Duration::minutes(self.inactivity_minutes))
    }

    /// The trigger flag that applies to an activity origin.
    pub fn triggers_on(&self, origin: ActivityOrigin) -> bool {
        match origin {
            ActivityOrigin::Contact => self.trigger_on_inbound,
            ActivityOrigin::Responder => self.trigger_on_outbound,
            ActivityOrigin::Operator | ActivityOrigin::FollowUp => false,
        }
    }
}

/// Durable per-conversation follow-up record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUpStatus {
    pub conversation_id: String,
    pub company_id: String,
    pub last_message_at: Option<DateTime<Utc>>,
    pub last_direction: Option<Direction>,
    pub follow_up_count: u32,
    pub last_follow_up_at: Option<DateTime<Utc>>,
    pub next_follow_up_at: Option<DateTime<Utc>>,
    pub paused: bool,
    pub eligible: bool,
    /// Bumped on every write; compare-and-set writes check it.
    pub version: i64,
}

/// Derived scheduling state of a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FollowUpState {
    Idle,
    Due,
    Paused,
    Exhausted,
}

impl FollowUpStatus {
    /// Derive the scheduling state from this row and the tenant's config.
    pub fn state(&self, config: &FollowUpConfig, now: DateTime<Utc>) -> FollowUpState {
        if self.paused {
            return FollowUpState::Paused;
        }
        if self.follow_up_count as usize >= config.active_steps().len() {
            return FollowUpState::Exhausted;
        }
        match self.next_follow_up_at {
            Some(next) if self.eligible && next <= now => FollowUpState::Due,
            _ => FollowUpState::Idle,
        }
    }
}

/// What a follow-up step asks the responder to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FollowUpContent {
    /// Ready-to-send text.
    Text { text: String },
    /// A prompt for the content generator; the responder sends what it produces.
    Generate { prompt: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(order: u32, delay: i64, active: bool) -> FollowUpStep {
        FollowUpStep {
            step_order: order,
            delay_minutes: delay,
            kind: StepKind::Template,
            template_body: Some("oi {lead_name}".into()),
            generation_prompt: None,
            active,
        }
    }

    fn status() -> FollowUpStatus {
        FollowUpStatus {
            conversation_id: "conv-1".into(),
            company_id: "co-1".into(),
            last_message_at: None,
            last_direction: None,
            follow_up_count: 0,
            last_follow_up_at: None,
            next_follow_up_at: None,
            paused: false,
            eligible: true,
            version: 0,
        }
    }

    #[test]
    fn active_steps_skip_inactive_and_sort_by_order() {
        let mut config = FollowUpConfig::defaults_for("co-1");
        config.steps = vec![step(3, 30, true), step(1, 10, true), step(2, 20, false)];

        let orders: Vec<u32> = config.active_steps().iter().map(|s| s.step_order).collect();
        assert_eq!(orders, vec![1, 3]);
    }

    #[test]
    fn first_delay_falls_back_to_inactivity() {
        let mut config = FollowUpConfig::defaults_for("co-1");
        assert_eq!(config.first_delay(), Duration::minutes(1440));

        config.steps = vec![step(1, 60, true)];
        assert_eq!(config.first_delay(), Duration::minutes(60));
    }

    #[test]
    fn operator_and_follow_up_never_trigger() {
        let config = FollowUpConfig::defaults_for("co-1");
        assert!(config.triggers_on(ActivityOrigin::Contact));
        assert!(config.triggers_on(ActivityOrigin::Responder));
        assert!(!config.triggers_on(ActivityOrigin::Operator));
        assert!(!config.triggers_on(ActivityOrigin::FollowUp));
    }

    #[test]
    fn derived_states() {
        let now = Utc::now();
        let mut config = FollowUpConfig::defaults_for("co-1");
        config.steps = vec![step(1, 60, true), step(2, 120, true)];

        let mut s = status();
        assert_eq!(s.state(&config, now), FollowUpState::Idle);

        s.next_follow_up_at = Some(now - Duration::minutes(1));
        assert_eq!(s.state(&config, now), FollowUpState::Due);

        s.paused = true;
        assert_eq!(s.state(&config, now), FollowUpState::Paused);

        s.paused = false;
        s.follow_up_count = 2;
        s.eligible = false;
        s.next_follow_up_at = None;
        assert_eq!(s.state(&config, now), FollowUpState::Exhausted);
    }

    #[test]
    fn lead_name_falls_back_when_blank() {
        let mut conv = Conversation {
            id: "conv-1".into(),
            company_id: "co-1".into(),
            contact_name: Some("  ".into()),
            phone_number: None,
            support_mode: SupportMode::Ai,
        };
        assert_eq!(conv.lead_name("cliente"), "cliente");
        conv.contact_name = Some("Ana".into());
        assert_eq!(conv.lead_name("cliente"), "Ana");
    }

    #[test]
    fn direction_uses_wire_names() {
        assert_eq!(Direction::Inbound.to_string(), "INBOUND");
        assert_eq!(ActivityOrigin::FollowUp.direction(), Direction::Outbound);
        let json = serde_json::to_string(&FollowUpContent::Generate {
            prompt: "p".into(),
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"generate","prompt":"p"}"#);
    }
}
