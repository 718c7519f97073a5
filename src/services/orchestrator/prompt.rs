//! Prompt Composition
//!
//! Builds the analysis prompt from fixed sections: project instructions,
//! repository summary, diff excerpts, additional context, the request itself,
//! and the output-format contract.

use crate::models::snapshot::RepositorySnapshot;

/// JSON contract the model is asked to answer with.
pub const OUTPUT_SCHEMA: &str = r#"{
  "finalPrompt": "string (optional)",
  "plan": {
    "summary": "string",
    "intent": "string",
    "safeguards": { "dryRun": true, "manualApproval": true, "notes": ["string"] },
    "steps": [
      {
        "id": "string",
        "action": "inspect | modify | create | delete | commit | run-command | push | pr",
        "description": "string",
        "targetPath": "string (optional)",
        "requiresApproval": true,
        "approved": false,
        "rationale": "string (optional)",
        "confidence": 0.0,
        "notes": ["string"],
        "diffExcerpt": "string (optional)",
        "providerMetadata": { "providerId": "string", "modelId": "string" }
      }
    ]
  },
  "patches": [ { "path": "string", "diff": "string", "summary": "string (optional)", "confidence": 0.0 } ],
  "commits": [ { "message": "string", "description": "string (optional)", "scope": "string (optional)", "files": ["string"] } ],
  "pullRequest": { "title": "string", "summary": "string (optional)", "body": "string (optional)", "highlights": ["string"] }
}"#;

const TRUNCATION_MARKER: &str = "\n... [diff truncated]";

/// Inputs to [`compose_prompt`].
#[derive(Debug, Clone, Copy)]
pub struct PromptInputs<'a> {
    pub instructions: Option<&'a str>,
    pub snapshot: &'a RepositorySnapshot,
    pub additional_context: Option<&'a str>,
    pub request: &'a str,
    pub max_diff_excerpt_chars: usize,
}

fn truncate_excerpt(diff: &str, max_chars: usize) -> String {
    if diff.chars().count() <= max_chars {
        return diff.trim_end().to_string();
    }
    let head: String = diff.chars().take(max_chars).collect();
    format!("{}{}", head.trim_end(), TRUNCATION_MARKER)
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Compose the full analysis prompt.
pub fn compose_prompt(inputs: &PromptInputs<'_>) -> String {
    let mut sections: Vec<String> = Vec::new();

    if let Some(instructions) = non_blank(inputs.instructions) {
        sections.push(format!("## Project Instructions\n{}", instructions));
    }

    let summary = inputs.snapshot.summary_lines();
    if !summary.is_empty() {
        sections.push(format!("## Repository\n{}", summary.join("\n")));
    }

    if !inputs.snapshot.diffs.is_empty() {
        let excerpts: Vec<String> = inputs
            .snapshot
            .diffs
            .iter()
            .map(|d| {
                format!(
                    "### {}\n```diff\n{}\n```",
                    d.path,
                    truncate_excerpt(&d.diff, inputs.max_diff_excerpt_chars)
                )
            })
            .collect();
        sections.push(format!("## Diff Excerpts\n{}", excerpts.join("\n\n")));
    }

    if let Some(context) = non_blank(inputs.additional_context) {
        sections.push(format!("## Additional Context\n{}", context));
    }

    sections.push(format!("## Request\n{}", inputs.request.trim()));

    sections.push(format!(
        "## Output Format\nRespond with a single JSON object matching this schema exactly. \
         Do not add commentary outside the JSON.\n```json\n{}\n```",
        OUTPUT_SCHEMA
    ));

    sections.join("\n\n")
}
