// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Checks applied before a tenant's follow-up config is saved.

use std::collections::HashSet;

use cadence_core::types::{FollowUpConfig, StepKind};
use cadence_core::CadenceError;

/// Tenant offsets beyond UTC±14h do not exist.
pub const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Validate a config, collecting every problem into one error.
pub fn validate_follow_up_config(config: &FollowUpConfig) -> Result<(), CadenceError> {
    let mut errors = Vec::new();

    if config.company_id.trim().is_empty() {
        errors.push("company_id must not be empty".to_string());
    }
    if config.start_hour > 23 {
        errors.push(format!("start_hour must be within 0-23, got {}", config.start_hour));
    }
    if config.end_hour > 23 {
        errors.push(format!("end_hour must be within 0-23, got {}", config.end_hour));
    }
    if config.inactivity_minutes <= 0 {
        errors.push(format!(
            "inactivity_minutes must be positive, got {}",
            config.inactivity_minutes
        ));
    }
    if config.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
        errors.push(format!(
            "utc_offset_minutes must be within +/-{MAX_UTC_OFFSET_MINUTES}, got {}",
            config.utc_offset_minutes
        ));
    }

    let mut seen = HashSet::new();
    for step in &config.steps {
        if !seen.insert(step.step_order) {
            errors.push(format!("duplicate step_order {}", step.step_order));
        }
        if step.delay_minutes < 0 {
            errors.push(format!(
                "step {} delay_minutes must not be negative, got {}",
                step.step_order, step.delay_minutes
            ));
        }
        if step.kind == StepKind::Template
            && step
                .template_body
                .as_deref()
                .is_none_or(|body| body.trim().is_empty())
        {
            errors.push(format!("template step {} needs a template_body", step.step_order));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(CadenceError::Validation(errors.join("; ")))
    }
}
