//! Response Normalizer
//!
//! Two-stage decoder for model output (strict JSON, then the first fenced
//! code block) and the field-by-field merge of the decoded payload onto the
//! heuristic plan. Malformed JSON is never repaired.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::artifacts::{
    AnalysisArtifacts, CommitArtifact, PatchArtifact, ProviderMetadata, PullRequestArtifact,
};
use crate::models::plan::{Plan, PlanStep, Safeguards, StepAction};

/// Model output that matches neither decoding stage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    #[error("Provider response was empty")]
    Empty,

    #[error("Provider response is not JSON and contains no parseable fenced block")]
    NotJson,
}

fn fenced_block() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)```[A-Za-z0-9_+\-]*[ \t]*\r?\n?(.*?)```").ok())
        .as_ref()
}

/// Decode raw model text into a JSON value.
pub fn decode_response(text: &str) -> Result<Value, ParseFailure> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseFailure::Empty);
    }

    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Ok(value);
    }

    let inner = fenced_block()
        .and_then(|fence| fence.captures(trimmed))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .ok_or(ParseFailure::NotJson)?;

    serde_json::from_str::<Value>(inner).map_err(|_| ParseFailure::NotJson)
}

// ============================================================================
// Field helpers
// ============================================================================

fn non_empty_str<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn owned_str(object: &Map<String, Value>, key: &str) -> Option<String> {
    non_empty_str(object, key).map(str::to_string)
}

fn finite_number(object: &Map<String, Value>, key: &str) -> Option<f64> {
    object
        .get(key)
        .and_then(Value::as_f64)
        .filter(|n| n.is_finite())
}

/// Non-empty strings of an array field; `None` when absent or empty.
fn string_list(object: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    let items: Vec<String> = object
        .get(key)?
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    (!items.is_empty()).then_some(items)
}

/// Transport metadata with the entry's declared provider/model ids applied.
fn entry_metadata(entry: &Map<String, Value>, transport: &ProviderMetadata) -> ProviderMetadata {
    let mut metadata = transport.clone();
    if let Some(declared) = entry.get("providerMetadata").and_then(Value::as_object) {
        if let Some(provider_id) = owned_str(declared, "providerId") {
            metadata.provider_id = provider_id;
        }
        if let Some(model_id) = owned_str(declared, "modelId") {
            metadata.model_id = model_id;
        }
    }
    metadata
}

// ============================================================================
// Plan merge
// ============================================================================

fn placeholder_step(index: usize) -> PlanStep {
    PlanStep::new(
        format!("step-{}", index + 1),
        StepAction::Inspect,
        "Provider-proposed step",
        false,
    )
}

fn merge_step(mut step: PlanStep, payload: &Map<String, Value>, transport: &ProviderMetadata) -> PlanStep {
    if let Some(id) = owned_str(payload, "id") {
        step.id = id;
    }

    let previous_action = step.action;
    if let Some(action) = non_empty_str(payload, "action").and_then(StepAction::parse) {
        step.action = action;
    }
    if let Some(description) = owned_str(payload, "description") {
        step.description = description;
    }
    if let Some(target) = owned_str(payload, "targetPath") {
        step.target_path = Some(target);
    }
    if let Some(requires_approval) = payload.get("requiresApproval").and_then(Value::as_bool) {
        step.requires_approval = requires_approval;
    }

    match payload.get("approved").and_then(Value::as_bool) {
        Some(approved) => step.approved = Some(approved),
        // An approval decision belongs to the action it was made for.
        None if step.action != previous_action => {
            step.approved = (step.action == StepAction::Inspect).then_some(true);
        }
        None => {}
    }

    if let Some(confidence) = finite_number(payload, "confidence") {
        step.confidence = Some(confidence);
    }
    if let Some(rationale) = owned_str(payload, "rationale") {
        step.rationale = Some(rationale);
    }
    if let Some(notes) = string_list(payload, "notes") {
        step.notes = notes;
    }
    if let Some(excerpt) = owned_str(payload, "diffExcerpt") {
        step.diff_excerpt = Some(excerpt);
    }
    step.provider_metadata = Some(entry_metadata(payload, transport));
    step
}

/// Payload safeguards may enable a safeguard, never disable one.
fn merge_safeguards(safeguards: &mut Safeguards, payload: &Map<String, Value>) {
    if let Some(notes) = string_list(payload, "notes") {
        safeguards.notes = notes;
    }
    if payload.get("dryRun").and_then(Value::as_bool) == Some(true) && !safeguards.dry_run {
        safeguards.set_dry_run(true);
    }
    if payload.get("manualApproval").and_then(Value::as_bool) == Some(true)
        && !safeguards.manual_approval
    {
        safeguards.set_manual_approval(true);
    }
}

/// Heuristic steps the payload did not describe carry the transport metadata.
fn stamp_transport(plan: &mut Plan, transport: &ProviderMetadata) {
    for step in plan.steps.iter_mut() {
        step.provider_metadata.get_or_insert_with(|| transport.clone());
    }
}

fn merge_plan(fallback: &Plan, payload: Option<&Map<String, Value>>, transport: &ProviderMetadata) -> Plan {
    let mut plan = fallback.clone();
    let Some(payload) = payload else {
        stamp_transport(&mut plan, transport);
        return plan;
    };

    if let Some(summary) = owned_str(payload, "summary") {
        plan.summary = summary;
    }
    if let Some(intent) = owned_str(payload, "intent") {
        plan.intent = intent;
    }

    let payload_steps: Vec<&Map<String, Value>> = payload
        .get("steps")
        .and_then(Value::as_array)
        .map(|steps| steps.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default();

    if !payload_steps.is_empty() {
        let mut seen_ids: HashSet<String> = HashSet::new();
        plan.steps = payload_steps
            .into_iter()
            .enumerate()
            .map(|(index, step_payload)| {
                let base = fallback
                    .steps
                    .get(index)
                    .cloned()
                    .unwrap_or_else(|| placeholder_step(index));
                let mut step = merge_step(base, step_payload, transport);
                if !seen_ids.insert(step.id.clone()) {
                    step.id = format!("step-{}", index + 1);
                    seen_ids.insert(step.id.clone());
                }
                step
            })
            .collect();
    }

    if let Some(safeguards) = payload.get("safeguards").and_then(Value::as_object) {
        merge_safeguards(&mut plan.safeguards, safeguards);
    }

    stamp_transport(&mut plan, transport);
    plan
}

// ============================================================================
// Artifact validation
// ============================================================================

fn entries<'a>(payload: &'a Map<String, Value>, key: &str) -> impl Iterator<Item = &'a Map<String, Value>> {
    payload
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

fn parse_patch(entry: &Map<String, Value>, transport: &ProviderMetadata) -> Option<PatchArtifact> {
    let path = owned_str(entry, "path")?;
    // Diff whitespace is significant; only blank diffs are rejected.
    let diff = entry
        .get("diff")
        .and_then(Value::as_str)
        .filter(|d| !d.trim().is_empty())?
        .to_string();
    Some(PatchArtifact {
        path,
        diff,
        summary: owned_str(entry, "summary"),
        confidence: finite_number(entry, "confidence"),
        provider_metadata: Some(entry_metadata(entry, transport)),
    })
}

fn parse_commit(entry: &Map<String, Value>, transport: &ProviderMetadata) -> Option<CommitArtifact> {
    Some(CommitArtifact {
        message: owned_str(entry, "message")?,
        description: owned_str(entry, "description"),
        scope: owned_str(entry, "scope"),
        files: string_list(entry, "files").unwrap_or_default(),
        provider_metadata: Some(entry_metadata(entry, transport)),
    })
}

fn parse_pull_request(entry: &Map<String, Value>, transport: &ProviderMetadata) -> Option<PullRequestArtifact> {
    Some(PullRequestArtifact {
        title: owned_str(entry, "title")?,
        summary: owned_str(entry, "summary"),
        body: owned_str(entry, "body"),
        highlights: string_list(entry, "highlights").unwrap_or_default(),
        provider_metadata: Some(entry_metadata(entry, transport)),
    })
}

/// Merge a decoded payload onto the heuristic plan.
///
/// Returns `None` when the payload is not a JSON object.
pub fn normalize(
    payload: &Value,
    fallback: &Plan,
    transport: &ProviderMetadata,
    composed_prompt: &str,
) -> Option<AnalysisArtifacts> {
    let payload = payload.as_object()?;

    let patches: Vec<PatchArtifact> = entries(payload, "patches")
        .filter_map(|entry| parse_patch(entry, transport))
        .collect();
    let commits: Vec<CommitArtifact> = entries(payload, "commits")
        .filter_map(|entry| parse_commit(entry, transport))
        .collect();
    let pull_request = payload
        .get("pullRequest")
        .and_then(Value::as_object)
        .and_then(|entry| parse_pull_request(entry, transport));

    let dropped = entries(payload, "patches").count() + entries(payload, "commits").count()
        - patches.len()
        - commits.len();
    if dropped > 0 {
        tracing::warn!(dropped, "dropped invalid patch/commit entries from provider payload");
    }

    Some(AnalysisArtifacts {
        final_prompt: owned_str(payload, "finalPrompt").unwrap_or_else(|| composed_prompt.to_string()),
        plan: merge_plan(
            fallback,
            payload.get("plan").and_then(Value::as_object),
            transport,
        ),
        patches,
        commits,
        pull_request,
        provider_metadata: Some(entry_metadata(payload, transport)),
        raw_response: None,
    })
}
