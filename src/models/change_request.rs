//! Change Request Models
//!
//! The natural-language request a user sends to the workflow, plus the
//! repository context it applies to.

use serde::{Deserialize, Serialize};

/// Risk classification supplied with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    #[default]
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

impl std::str::FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            other => Err(format!("Unknown risk level: {}", other)),
        }
    }
}

/// Repository context a request applies to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub repository_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    #[serde(default)]
    pub risk_level: RiskLevel,
}

/// A natural-language repository-change request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequest {
    pub prompt: String,
    pub context: RequestContext,
    /// Explicit dry-run override (default: dry run on)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefer_dry_run: Option<bool>,
    /// Explicit manual-approval override (default: on unless risk is low)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_approval: Option<bool>,
}

impl ChangeRequest {
    pub fn new(prompt: impl Into<String>, repository_path: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            context: RequestContext {
                repository_path: repository_path.into(),
                ..Default::default()
            },
            prefer_dry_run: None,
            require_approval: None,
        }
    }

    /// Builder pattern: set risk level
    pub fn with_risk(mut self, risk_level: RiskLevel) -> Self {
        self.context.risk_level = risk_level;
        self
    }

    /// Builder pattern: set branch
    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.context.branch = Some(branch.into());
        self
    }
}
