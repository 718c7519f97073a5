//! Plan Engine Integration Tests
//!
//! Heuristic plans built through the public API:
//! - File hints only come from backtick spans
//! - Multi-clause requests keep request order
//! - Safeguards follow risk and overrides, and toggles replace their notes

use changeflow::models::change_request::{ChangeRequest, RiskLevel};
use changeflow::models::plan::StepAction;
use changeflow::services::plan_engine::{create_plan, extract_path_hints};

fn request(prompt: &str) -> ChangeRequest {
    ChangeRequest::new(prompt, "/repo")
}

#[test]
fn test_plain_file_name_is_not_a_target() {
    let plan = create_plan(&request("Modify src/core/example.ts to add X"));
    assert_eq!(plan.steps.len(), 1);
    assert_eq!(plan.steps[0].action, StepAction::Modify);
    assert_eq!(plan.steps[0].target_path, None);
}

#[test]
fn test_backtick_file_name_is_the_target() {
    let plan = create_plan(&request("Modify `src/core/example.ts` to add X"));
    assert_eq!(plan.steps.len(), 1);
    assert_eq!(plan.steps[0].action, StepAction::Modify);
    assert_eq!(plan.steps[0].target_path.as_deref(), Some("src/core/example.ts"));
}

#[test]
fn test_full_delivery_request() {
    let plan = create_plan(&request(
        "Create `src/auth.rs`, update `src/lib.rs`, then commit. Push the branch and open a pull request",
    ));
    let actions: Vec<StepAction> = plan.steps.iter().map(|s| s.action).collect();
    assert_eq!(
        actions,
        vec![
            StepAction::Create,
            StepAction::Modify,
            StepAction::Commit,
            StepAction::Push,
            StepAction::Pr
        ]
    );
    assert_eq!(plan.steps[0].target_path.as_deref(), Some("src/auth.rs"));
    assert_eq!(plan.steps[1].target_path.as_deref(), Some("src/lib.rs"));
    assert_eq!(plan.intent, "create, modify, commit, push, pr");

    let approvals: Vec<bool> = plan.steps.iter().map(|s| s.requires_approval).collect();
    assert_eq!(approvals, vec![true, false, false, true, true]);
    assert_eq!(plan.pending_approvals().count(), 3);
}

#[test]
fn test_unrecognised_request_becomes_inspection() {
    let plan = create_plan(&request("Why is the build slow?"));
    assert_eq!(plan.steps.len(), 1);
    assert_eq!(plan.steps[0].action, StepAction::Inspect);
    assert_eq!(plan.steps[0].approved, Some(true));
    assert!(plan.steps[0].description.contains("Why is the build slow?"));
}

#[test]
fn test_identical_requests_yield_identical_steps() {
    let req = request("Delete `tmp/cache.bin` and commit");
    let first = create_plan(&req);
    let second = create_plan(&req);
    assert_ne!(first.id, second.id);
    assert_eq!(first.step_signature(), second.step_signature());
    assert_eq!(first.safeguards, second.safeguards);
}

#[test]
fn test_safeguards_by_risk() {
    let low = create_plan(&request("Update docs").with_risk(RiskLevel::Low));
    assert!(low.safeguards.dry_run);
    assert!(!low.safeguards.manual_approval);

    let high = create_plan(&request("Update docs").with_risk(RiskLevel::High));
    assert!(high.safeguards.manual_approval);
    assert!(high.safeguards.notes.iter().any(|n| n.starts_with("High risk")));

    let mut overridden = request("Update docs");
    overridden.prefer_dry_run = Some(false);
    overridden.require_approval = Some(false);
    let plan = create_plan(&overridden);
    assert!(!plan.safeguards.dry_run);
    assert!(!plan.safeguards.manual_approval);
}

#[test]
fn test_toggle_replaces_note() {
    let mut plan = create_plan(&request("Update docs"));
    let before = plan.safeguards.notes.len();
    plan.safeguards.set_dry_run(false);
    plan.safeguards.set_dry_run(true);
    plan.safeguards.set_dry_run(false);
    assert_eq!(plan.safeguards.notes.len(), before);
    assert!(plan
        .safeguards
        .notes
        .iter()
        .any(|n| n.starts_with("Dry run disabled")));
}

#[test]
fn test_path_hints_in_order() {
    assert_eq!(
        extract_path_hints("Move `a.rs` next to `b/c.rs`"),
        vec!["a.rs".to_string(), "b/c.rs".to_string()]
    );
    assert!(extract_path_hints("no hints here").is_empty());
}
