//! Repository Snapshot Models
//!
//! Branch/commit/remote context, working-tree status, and bounded per-file
//! diffs collected as analysis context.

use serde::{Deserialize, Serialize};

/// Last commit on the current branch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitSummary {
    pub id: String,
    pub message: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub time: String,
}

/// Remote the current branch tracks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSummary {
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
}

/// Branch, last commit, and remote of a repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositorySummary {
    pub branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_commit: Option<CommitSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteSummary>,
}

/// Status of one working-tree entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntry {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<String>,
    #[serde(default)]
    pub is_conflicted: bool,
}

/// Unified diff for one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDiff {
    pub path: String,
    pub diff: String,
}

/// Collected repository state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositorySnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<RepositorySummary>,
    #[serde(default)]
    pub status: Vec<StatusEntry>,
    #[serde(default)]
    pub diffs: Vec<FileDiff>,
}

impl RepositorySnapshot {
    pub fn is_empty(&self) -> bool {
        self.summary.is_none() && self.status.is_empty() && self.diffs.is_empty()
    }

    /// Human-readable summary lines used in prompts.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(summary) = &self.summary {
            lines.push(format!("Branch: {}", summary.branch));
            if let Some(commit) = &summary.last_commit {
                let short = commit.id.chars().take(8).collect::<String>();
                lines.push(format!("Last commit: {} {}", short, commit.message));
            }
            if let Some(remote) = &summary.remote {
                match &remote.branch {
                    Some(branch) => lines.push(format!(
                        "Remote: {} ({}) tracking {}",
                        remote.name, remote.url, branch
                    )),
                    None => lines.push(format!("Remote: {} ({})", remote.name, remote.url)),
                }
            }
        }
        if !self.status.is_empty() {
            lines.push(format!("Changed files: {}", self.status.len()));
            for entry in &self.status {
                let code = format!(
                    "{}{}",
                    entry.index.as_deref().unwrap_or(" "),
                    entry.workdir.as_deref().unwrap_or(" ")
                );
                let conflict = if entry.is_conflicted { " (conflicted)" } else { "" };
                lines.push(format!("  [{}] {}{}", code, entry.path, conflict));
            }
        }
        lines
    }
}
