// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for the domain values most tests need.

use chrono::{DateTime, TimeZone, Utc};

use cadence_core::types::{
    Company, Conversation, FollowUpConfig, FollowUpStep, StepKind, SupportMode,
};

/// A fixed Monday, 10:00 UTC: inside the default 8-22 window.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0)
        .single()
        .unwrap_or_default()
}

pub fn company(id: &str) -> Company {
    Company {
        id: id.to_string(),
        name: format!("Company {id}"),
    }
}

pub fn conversation(id: &str, company_id: &str, contact_name: Option<&str>) -> Conversation {
    Conversation {
        id: id.to_string(),
        company_id: company_id.to_string(),
        contact_name: contact_name.map(str::to_string),
        phone_number: Some("+5511999990000".to_string()),
        support_mode: SupportMode::Ai,
    }
}

pub fn template_step(order: u32, delay_minutes: i64, body: &str) -> FollowUpStep {
    FollowUpStep {
        step_order: order,
        delay_minutes,
        kind: StepKind::Template,
        template_body: Some(body.to_string()),
        generation_prompt: None,
        active: true,
    }
}

pub fn generated_step(order: u32, delay_minutes: i64, prompt: Option<&str>) -> FollowUpStep {
    FollowUpStep {
        step_order: order,
        delay_minutes,
        kind: StepKind::Generated,
        template_body: None,
        generation_prompt: prompt.map(str::to_string),
        active: true,
    }
}

/// An enabled config with both triggers on, the default window, and `steps`.
pub fn enabled_config(company_id: &str, steps: Vec<FollowUpStep>) -> FollowUpConfig {
    FollowUpConfig {
        enabled: true,
        steps,
        ..FollowUpConfig::defaults_for(company_id)
    }
}

/// Two template steps, 60 and 120 minutes apart.
pub fn two_step_config(company_id: &str) -> FollowUpConfig {
    enabled_config(
        company_id,
        vec![
            template_step(1, 60, "Oi {lead_name}, ainda posso ajudar?"),
            template_step(2, 120, "{lead_name}, seguimos a disposicao na {company_name}."),
        ],
    )
}
