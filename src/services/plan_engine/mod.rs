//! Plan Engine
//!
//! Pure heuristic plan synthesis from change-request text. No I/O; the same
//! request always yields the same steps (only ids and timestamps differ).
//!
//! The prompt is split into clauses at sentence punctuation, commas, newlines
//! and the connectives "and"/"then". Each clause contributes at most one step:
//! the keyword that appears earliest in the clause wins, ties going to the
//! earlier table entry. Backtick spans are file-path hints and never count as
//! keywords.

use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

use crate::models::change_request::{ChangeRequest, RiskLevel};
use crate::models::plan::{Plan, PlanStep, SafeguardTopic, Safeguards, StepAction, HIGH_RISK_NOTE};

const SUMMARY_MAX_CHARS: usize = 120;

/// One row of the keyword table.
struct ActionRule {
    action: StepAction,
    requires_approval: bool,
    regex: Regex,
}

/// Ordered keyword table (compiled once).
fn action_rules() -> &'static Vec<ActionRule> {
    static RULES: OnceLock<Vec<ActionRule>> = OnceLock::new();
    RULES.get_or_init(|| {
        let raw: [(StepAction, bool, &str); 6] = [
            (StepAction::Create, true, r"(?i)\b(?:create|add)\b"),
            (StepAction::Modify, false, r"(?i)\b(?:modify|update)\b"),
            (StepAction::Delete, true, r"(?i)\b(?:delete|remove)\b"),
            (StepAction::Commit, false, r"(?i)\bcommit\b"),
            (StepAction::Push, true, r"(?i)\bpush\b"),
            (
                StepAction::Pr,
                true,
                r"(?i)\b(?:pr|pull[\s-]request|merge[\s-]request)\b",
            ),
        ];
        raw.into_iter()
            .filter_map(|(action, requires_approval, pattern)| {
                Regex::new(pattern).ok().map(|regex| ActionRule {
                    action,
                    requires_approval,
                    regex,
                })
            })
            .collect()
    })
}

fn clause_separator() -> Option<&'static Regex> {
    static SEPARATOR: OnceLock<Option<Regex>> = OnceLock::new();
    SEPARATOR
        .get_or_init(|| Regex::new(r"(?i)[.;!?](?:\s+|$)|,|\n|\b(?:and|then)\b").ok())
        .as_ref()
}

fn backtick_span() -> Option<&'static Regex> {
    static SPAN: OnceLock<Option<Regex>> = OnceLock::new();
    SPAN.get_or_init(|| Regex::new(r"`([^`\n]+)`").ok()).as_ref()
}

/// Backtick-delimited path hints, in prompt order.
pub fn extract_path_hints(prompt: &str) -> Vec<String> {
    let Some(span) = backtick_span() else {
        return Vec::new();
    };
    span.captures_iter(prompt)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|hint| !hint.is_empty())
        .collect()
}

/// Blank out backtick spans byte-for-byte so offsets stay aligned with the prompt.
fn mask_backticks(prompt: &str) -> String {
    match backtick_span() {
        Some(span) => span
            .replace_all(prompt, |caps: &regex::Captures| " ".repeat(caps[0].len()))
            .into_owned(),
        None => prompt.to_string(),
    }
}

/// Byte ranges of the non-blank clauses of `text`.
fn clause_ranges(text: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    if let Some(separator) = clause_separator() {
        for m in separator.find_iter(text) {
            ranges.push(start..m.start());
            start = m.end();
        }
    }
    ranges.push(start..text.len());
    ranges
        .into_iter()
        .filter(|r| !text[r.clone()].trim().is_empty())
        .collect()
}

/// The earliest keyword match in a clause, ties resolved by table order.
fn match_clause(clause: &str) -> Option<&'static ActionRule> {
    action_rules()
        .iter()
        .filter_map(|rule| rule.regex.find(clause).map(|m| (m.start(), rule)))
        .min_by_key(|(start, _)| *start)
        .map(|(_, rule)| rule)
}

fn hint_for(hints: &[String], index: usize) -> Option<String> {
    hints.get(index).or_else(|| hints.last()).cloned()
}

fn summarize(prompt: &str) -> String {
    let first_line = prompt.trim().lines().next().unwrap_or("").trim();
    if first_line.chars().count() <= SUMMARY_MAX_CHARS {
        return first_line.to_string();
    }
    let truncated: String = first_line.chars().take(SUMMARY_MAX_CHARS - 3).collect();
    format!("{}...", truncated.trim_end())
}

/// Safeguard policy for a request, with a note per active safeguard.
pub fn initial_safeguards(request: &ChangeRequest) -> Safeguards {
    let dry_run = request.prefer_dry_run.unwrap_or(true);
    let manual_approval = request
        .require_approval
        .unwrap_or(request.context.risk_level != RiskLevel::Low);

    let mut safeguards = Safeguards {
        dry_run: false,
        manual_approval: false,
        notes: Vec::new(),
    };
    if dry_run {
        safeguards.set_dry_run(true);
    }
    safeguards.set_manual_approval(manual_approval);
    if request.context.risk_level == RiskLevel::High {
        safeguards.set_note(SafeguardTopic::HighRisk, Some(HIGH_RISK_NOTE));
    }
    safeguards
}

/// Synthesize a heuristic plan from a change request.
pub fn create_plan(request: &ChangeRequest) -> Plan {
    let prompt = request.prompt.as_str();
    let hints = extract_path_hints(prompt);
    let masked = mask_backticks(prompt);

    let mut steps: Vec<PlanStep> = Vec::new();
    for range in clause_ranges(&masked) {
        let Some(rule) = match_clause(&masked[range.clone()]) else {
            continue;
        };
        let index = steps.len();
        let description = prompt[range].trim().to_string();
        steps.push(
            PlanStep::new(
                format!("step-{}", index + 1),
                rule.action,
                description,
                rule.requires_approval,
            )
            .with_target(hint_for(&hints, index)),
        );
    }

    if steps.is_empty() {
        let description = if prompt.trim().is_empty() {
            "Inspect the repository".to_string()
        } else {
            format!("Inspect the repository for: {}", prompt.trim())
        };
        steps.push(
            PlanStep::new("step-1", StepAction::Inspect, description, false)
                .with_target(hint_for(&hints, 0)),
        );
    }

    let mut intent: Vec<&str> = Vec::new();
    for step in &steps {
        if !intent.contains(&step.action.as_str()) {
            intent.push(step.action.as_str());
        }
    }

    tracing::debug!(
        steps = steps.len(),
        hints = hints.len(),
        "heuristic plan created"
    );

    Plan {
        id: uuid::Uuid::new_v4().to_string(),
        summary: summarize(prompt),
        intent: intent.join(", "),
        steps,
        safeguards: initial_safeguards(request),
        created_at: chrono::Utc::now().to_rfc3339(),
    }
}
