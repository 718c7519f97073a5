//! Plan Models
//!
//! The structured, steppable remediation proposal produced by analysis,
//! together with its safeguard policy.

use serde::{Deserialize, Serialize};

use super::artifacts::ProviderMetadata;

// ============================================================================
// Step Types
// ============================================================================

/// Action a plan step performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepAction {
    Inspect,
    Modify,
    Create,
    Delete,
    Commit,
    RunCommand,
    Push,
    Pr,
}

impl StepAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepAction::Inspect => "inspect",
            StepAction::Modify => "modify",
            StepAction::Create => "create",
            StepAction::Delete => "delete",
            StepAction::Commit => "commit",
            StepAction::RunCommand => "run-command",
            StepAction::Push => "push",
            StepAction::Pr => "pr",
        }
    }

    /// Parse the wire name of an action (as emitted by models).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "inspect" => Some(StepAction::Inspect),
            "modify" => Some(StepAction::Modify),
            "create" => Some(StepAction::Create),
            "delete" => Some(StepAction::Delete),
            "commit" => Some(StepAction::Commit),
            "run-command" | "run_command" => Some(StepAction::RunCommand),
            "push" => Some(StepAction::Push),
            "pr" => Some(StepAction::Pr),
            _ => None,
        }
    }
}

impl std::fmt::Display for StepAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single step in a Plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStep {
    pub id: String,
    pub action: StepAction,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_path: Option<String>,
    pub requires_approval: bool,
    /// Tri-state approval: `None` means no decision yet
    #[serde(default)]
    pub approved: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    #[serde(default)]
    pub notes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diff_excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_metadata: Option<ProviderMetadata>,
}

impl PlanStep {
    /// Create a step. `inspect` steps start approved, every other step starts undecided.
    pub fn new(
        id: impl Into<String>,
        action: StepAction,
        description: impl Into<String>,
        requires_approval: bool,
    ) -> Self {
        Self {
            id: id.into(),
            action,
            description: description.into(),
            target_path: None,
            requires_approval,
            approved: if action == StepAction::Inspect {
                Some(true)
            } else {
                None
            },
            confidence: None,
            rationale: None,
            notes: Vec::new(),
            diff_excerpt: None,
            provider_metadata: None,
        }
    }

    /// Builder pattern: set target path
    pub fn with_target(mut self, target_path: Option<String>) -> Self {
        self.target_path = target_path;
        self
    }
}

// ============================================================================
// Safeguards
// ============================================================================

/// Topic a safeguard note belongs to. Each topic holds at most one note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafeguardTopic {
    DryRun,
    ManualApproval,
    HighRisk,
}

impl SafeguardTopic {
    fn prefix(&self) -> &'static str {
        match self {
            SafeguardTopic::DryRun => "Dry run",
            SafeguardTopic::ManualApproval => "Manual approval",
            SafeguardTopic::HighRisk => "High risk",
        }
    }
}

const DRY_RUN_ON_NOTE: &str =
    "Dry run enabled: changes are previewed and never applied without confirmation.";
const DRY_RUN_OFF_NOTE: &str = "Dry run disabled: approved changes are applied directly.";
const MANUAL_APPROVAL_ON_NOTE: &str =
    "Manual approval required: each mutating step must be approved before it runs.";
pub(crate) const HIGH_RISK_NOTE: &str =
    "High risk request: review every step and its diff before approving.";

/// Dry-run and manual-approval policy attached to a Plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Safeguards {
    pub dry_run: bool,
    pub manual_approval: bool,
    #[serde(default)]
    pub notes: Vec<String>,
}

impl Default for Safeguards {
    fn default() -> Self {
        let mut safeguards = Self {
            dry_run: true,
            manual_approval: true,
            notes: Vec::new(),
        };
        safeguards.set_dry_run(true);
        safeguards.set_manual_approval(true);
        safeguards
    }
}

impl Safeguards {
    /// Replace the note for `topic` in place, or append it when absent.
    /// `None` removes the topic's note.
    pub fn set_note(&mut self, topic: SafeguardTopic, note: Option<&str>) {
        let position = self
            .notes
            .iter()
            .position(|n| n.starts_with(topic.prefix()));
        match (position, note) {
            (Some(idx), Some(text)) => self.notes[idx] = text.to_string(),
            (Some(idx), None) => {
                self.notes.remove(idx);
            }
            (None, Some(text)) => self.notes.push(text.to_string()),
            (None, None) => {}
        }
        self.notes.retain({
            let mut seen = false;
            move |n| {
                if !n.starts_with(topic.prefix()) {
                    return true;
                }
                let keep = !seen;
                seen = true;
                keep
            }
        });
    }

    /// Explicit dry-run toggle.
    pub fn set_dry_run(&mut self, enabled: bool) {
        self.dry_run = enabled;
        let note = if enabled {
            DRY_RUN_ON_NOTE
        } else {
            DRY_RUN_OFF_NOTE
        };
        self.set_note(SafeguardTopic::DryRun, Some(note));
    }

    /// Explicit manual-approval toggle.
    pub fn set_manual_approval(&mut self, enabled: bool) {
        self.manual_approval = enabled;
        let note = enabled.then_some(MANUAL_APPROVAL_ON_NOTE);
        self.set_note(SafeguardTopic::ManualApproval, note);
    }
}

// ============================================================================
// Plan
// ============================================================================

/// A complete Plan with ordered steps and safeguards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: String,
    pub summary: String,
    pub intent: String,
    pub steps: Vec<PlanStep>,
    pub safeguards: Safeguards,
    pub created_at: String,
}

impl Plan {
    /// Record an approval decision for a step. Returns false when no step matches.
    pub fn set_step_approval(&mut self, step_id: &str, approved: Option<bool>) -> bool {
        match self.steps.iter_mut().find(|s| s.id == step_id) {
            Some(step) => {
                step.approved = approved;
                true
            }
            None => false,
        }
    }

    /// Re-apply the toggles made on `current` since `baseline` was published.
    ///
    /// Safeguards that changed go through the toggle API, so their notes follow.
    /// Step approvals carry over to steps with the same id.
    pub fn carry_decisions(&mut self, baseline: &Plan, current: &Plan) {
        let (before, after) = (&baseline.safeguards, &current.safeguards);
        if before.dry_run != after.dry_run {
            self.safeguards.set_dry_run(after.dry_run);
        }
        if before.manual_approval != after.manual_approval {
            self.safeguards.set_manual_approval(after.manual_approval);
        }

        for step in &current.steps {
            let changed = baseline
                .steps
                .iter()
                .find(|s| s.id == step.id)
                .map_or(true, |s| s.approved != step.approved);
            if changed {
                self.set_step_approval(&step.id, step.approved);
            }
        }
    }

    /// `(action, description, target_path)` per step, ignoring ids and timestamps.
    pub fn step_signature(&self) -> Vec<(StepAction, String, Option<String>)> {
        self.steps
            .iter()
            .map(|s| (s.action, s.description.clone(), s.target_path.clone()))
            .collect()
    }

    /// Steps still waiting for an approval decision.
    pub fn pending_approvals(&self) -> impl Iterator<Item = &PlanStep> {
        self.steps
            .iter()
            .filter(|s| s.requires_approval && s.approved.is_none())
    }
}
