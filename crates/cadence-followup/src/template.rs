// SPDX-FileCopyrightText: 2026 Blufio Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Step content rendering.
//!
//! Placeholders are `{lead_name}`, `{company_name}` and `{phone_number}`.
//! Unknown braces are left untouched.

use cadence_core::types::{FollowUpContent, FollowUpStep, StepKind};

/// Prompt used for generated steps without their own prompt.
pub const DEFAULT_REENGAGEMENT_PROMPT: &str = "CONTEXTO DE REENGAJAMENTO (FOLLOW-UP):\n\
O lead {lead_name} parou de responder na conversa anterior.\n\
Crie uma mensagem de retomada curta e informal, empatica e prestativa, \
que termine com uma pergunta simples para facilitar a resposta.\n\
Retorne APENAS o texto da mensagem, sem aspas ou prefixos.";

/// Text sent by a template step whose body is missing.
pub const DEFAULT_CHECK_IN_TEXT: &str =
    "Olá {lead_name}! Estou passando para ver se posso ajudar com mais alguma coisa.";

/// Values substituted into step templates and prompts.
#[derive(Debug, Clone, Copy)]
pub struct TemplateVars<'a> {
    pub lead_name: &'a str,
    pub company_name: &'a str,
    pub phone_number: &'a str,
}

impl TemplateVars<'_> {
    fn lookup(&self, key: &str) -> Option<&str> {
        match key {
            "lead_name" => Some(self.lead_name),
            "company_name" => Some(self.company_name),
            "phone_number" => Some(self.phone_number),
            _ => None,
        }
    }
}

/// Substitute placeholders in one left-to-right pass; substituted values
/// are never scanned again.
pub fn render(template: &str, vars: &TemplateVars<'_>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let tail = &rest[open..];
        let value = tail
            .find('}')
            .and_then(|close| vars.lookup(&tail[1..close]).map(|v| (v, close)));
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &tail[close + 1..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn non_blank(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|s| !s.trim().is_empty())
}

/// What the responder should send for `step`.
pub fn step_content(step: &FollowUpStep, vars: &TemplateVars<'_>) -> FollowUpContent {
    match step.kind {
        StepKind::Template => FollowUpContent::Text {
            text: render(
                non_blank(&step.template_body).unwrap_or(DEFAULT_CHECK_IN_TEXT),
                vars,
            ),
        },
        StepKind::Generated => FollowUpContent::Generate {
            prompt: render(
                non_blank(&step.generation_prompt).unwrap_or(DEFAULT_REENGAGEMENT_PROMPT),
                vars,
            ),
        },
    }
}
