//! Agent Selector
//!
//! Resolves the primary and optional fallback agent from orchestrator
//! preferences and a snapshot of the registry. Pure: no registry lookups.

use crate::models::agent::{AgentDefinition, DegradationPolicy, OrchestratorPreferences};

/// Chosen agents, by value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentSelection {
    pub primary: Option<AgentDefinition>,
    pub fallback: Option<AgentDefinition>,
}

impl AgentSelection {
    pub fn primary_id(&self) -> Option<&str> {
        self.primary.as_ref().map(|a| a.id.as_str())
    }

    pub fn fallback_id(&self) -> Option<&str> {
        self.fallback.as_ref().map(|a| a.id.as_str())
    }
}

fn matches_pref(value: &str, preference: Option<&str>) -> bool {
    preference
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .is_some_and(|p| value.eq_ignore_ascii_case(p))
}

fn ready(agent: &AgentDefinition) -> bool {
    agent.active && agent.has_valid_credentials()
}

/// Candidates in priority order: model matches, provider matches (ready
/// agents first within each group), then all active agents, then the pool.
fn priority_list<'a>(
    pool: &[&'a AgentDefinition],
    provider: Option<&str>,
    model: Option<&str>,
    exclude: Option<&str>,
) -> Vec<&'a AgentDefinition> {
    let ranked = |filter: &dyn Fn(&AgentDefinition) -> bool| -> Vec<&'a AgentDefinition> {
        let (mut first, rest): (Vec<&AgentDefinition>, Vec<&AgentDefinition>) = pool
            .iter()
            .copied()
            .filter(|a| filter(a))
            .partition(|a| ready(a));
        first.extend(rest);
        first
    };

    let mut candidates: Vec<&'a AgentDefinition> = Vec::new();
    candidates.extend(ranked(&|a| matches_pref(&a.model, model)));
    candidates.extend(ranked(&|a| matches_pref(&a.provider, provider)));
    candidates.extend(pool.iter().copied().filter(|a| a.active));
    candidates.extend(pool.iter().copied());

    let mut seen: Vec<&str> = Vec::new();
    candidates.retain(|a| {
        if Some(a.id.as_str()) == exclude || seen.contains(&a.id.as_str()) {
            return false;
        }
        seen.push(a.id.as_str());
        true
    });
    candidates
}

fn pick(
    pool: &[&AgentDefinition],
    provider: Option<&str>,
    model: Option<&str>,
    exclude: Option<&str>,
) -> Option<AgentDefinition> {
    priority_list(pool, provider, model, exclude)
        .into_iter()
        .find(|a| a.has_valid_credentials())
        .cloned()
}

/// Select the primary and fallback agents.
pub fn select_agents(agents: &[AgentDefinition], preferences: &OrchestratorPreferences) -> AgentSelection {
    let pool: Vec<&AgentDefinition> = agents
        .iter()
        .filter(|a| preferences.mode.allows(a.kind))
        .collect();

    let primary = pick(
        &pool,
        preferences.primary_provider.as_deref(),
        preferences.primary_model.as_deref(),
        None,
    );

    let fallback = match (&primary, preferences.degradation_policy) {
        (Some(primary), DegradationPolicy::OnError) => pick(
            &pool,
            preferences.fallback_provider.as_deref(),
            preferences.fallback_model.as_deref(),
            Some(primary.id.as_str()),
        ),
        _ => None,
    };

    tracing::debug!(
        pool = pool.len(),
        primary = primary.as_ref().map(|a| a.id.as_str()),
        fallback = fallback.as_ref().map(|a| a.id.as_str()),
        "agents selected"
    );

    AgentSelection { primary, fallback }
}
