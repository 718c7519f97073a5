//! Git Command Interface
//!
//! A single dispatch seam (`GitBridge::invoke`) over the external git
//! backend, plus typed helpers that decode its JSON replies into snapshot
//! models.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::snapshot::{RepositorySummary, StatusEntry};

// ============================================================================
// Commands
// ============================================================================

/// Commands understood by a git bridge.
///
/// Serialized as `{"command": "<kebab-name>", "repositoryPath": ..., ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum GitCommand {
    GetRepositoryContext {
        repository_path: String,
    },
    RepositoryStatus {
        repository_path: String,
    },
    GetFileDiff {
        repository_path: String,
        path: String,
    },
    Commit {
        repository_path: String,
        message: String,
        #[serde(default)]
        files: Vec<String>,
    },
    Push {
        repository_path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        remote: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        branch: Option<String>,
    },
    Pull {
        repository_path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        remote: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        branch: Option<String>,
    },
    CreatePullRequest {
        repository_path: String,
        title: String,
        #[serde(default)]
        body: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        head: Option<String>,
    },
    ListUserRepos {
        repository_path: String,
    },
    Clone {
        repository_path: String,
        url: String,
        destination: String,
    },
    ListRepositoryFiles {
        repository_path: String,
    },
}

impl GitCommand {
    /// Wire name of the command.
    pub fn name(&self) -> &'static str {
        match self {
            GitCommand::GetRepositoryContext { .. } => "get-repository-context",
            GitCommand::RepositoryStatus { .. } => "repository-status",
            GitCommand::GetFileDiff { .. } => "get-file-diff",
            GitCommand::Commit { .. } => "commit",
            GitCommand::Push { .. } => "push",
            GitCommand::Pull { .. } => "pull",
            GitCommand::CreatePullRequest { .. } => "create-pull-request",
            GitCommand::ListUserRepos { .. } => "list-user-repos",
            GitCommand::Clone { .. } => "clone",
            GitCommand::ListRepositoryFiles { .. } => "list-repository-files",
        }
    }

    pub fn repository_path(&self) -> &str {
        match self {
            GitCommand::GetRepositoryContext { repository_path }
            | GitCommand::RepositoryStatus { repository_path }
            | GitCommand::GetFileDiff {
                repository_path, ..
            }
            | GitCommand::Commit {
                repository_path, ..
            }
            | GitCommand::Push {
                repository_path, ..
            }
            | GitCommand::Pull {
                repository_path, ..
            }
            | GitCommand::CreatePullRequest {
                repository_path, ..
            }
            | GitCommand::ListUserRepos { repository_path }
            | GitCommand::Clone {
                repository_path, ..
            }
            | GitCommand::ListRepositoryFiles { repository_path } => repository_path,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Errors raised by a git bridge.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GitBridgeError {
    /// No git backend exists in this runtime
    #[error("Git bridge unavailable for {command}")]
    Unavailable { command: String },

    /// The backend ran the command and it failed
    #[error("{command} failed: {message}")]
    Failed { command: String, message: String },

    /// The backend replied with something the helper could not decode
    #[error("Unexpected {command} response: {message}")]
    Decode { command: String, message: String },
}

pub type GitBridgeResult<T> = Result<T, GitBridgeError>;

impl GitBridgeError {
    pub fn unavailable(command: impl Into<String>) -> Self {
        Self::Unavailable {
            command: command.into(),
        }
    }

    pub fn failed(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn decode(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, GitBridgeError::Unavailable { .. })
    }

    /// Message without the command prefix.
    pub fn detail(&self) -> String {
        match self {
            GitBridgeError::Unavailable { command } => format!("{} is unavailable", command),
            GitBridgeError::Failed { message, .. } | GitBridgeError::Decode { message, .. } => {
                message.clone()
            }
        }
    }
}

// ============================================================================
// Bridge trait
// ============================================================================

/// Dispatch seam over the external git backend.
#[async_trait]
pub trait GitBridge: Send + Sync {
    async fn invoke(&self, command: GitCommand) -> GitBridgeResult<Value>;
}

fn decode<T: serde::de::DeserializeOwned>(command: &str, value: Value) -> GitBridgeResult<T> {
    serde_json::from_value(value).map_err(|e| GitBridgeError::decode(command, e.to_string()))
}

/// Reply text of commands that answer with either a bare string or an object.
fn reply_text(value: &Value, field: &str) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => map.get(field).and_then(|v| v.as_str()).map(str::to_string),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

/// Typed helpers over [`GitBridge::invoke`].
#[async_trait]
pub trait GitBridgeExt: GitBridge {
    async fn repository_context(&self, repository_path: &str) -> GitBridgeResult<RepositorySummary> {
        let command = GitCommand::GetRepositoryContext {
            repository_path: repository_path.to_string(),
        };
        let name = command.name();
        let value = self.invoke(command).await?;
        decode(name, value)
    }

    async fn repository_status(&self, repository_path: &str) -> GitBridgeResult<Vec<StatusEntry>> {
        let command = GitCommand::RepositoryStatus {
            repository_path: repository_path.to_string(),
        };
        let name = command.name();
        match self.invoke(command).await? {
            Value::Null => Ok(Vec::new()),
            value => decode(name, value),
        }
    }

    async fn file_diff(&self, repository_path: &str, path: &str) -> GitBridgeResult<String> {
        let command = GitCommand::GetFileDiff {
            repository_path: repository_path.to_string(),
            path: path.to_string(),
        };
        let name = command.name();
        let value = self.invoke(command).await?;
        reply_text(&value, "diff")
            .ok_or_else(|| GitBridgeError::decode(name, "expected diff text"))
    }

    async fn pull(
        &self,
        repository_path: &str,
        remote: Option<String>,
        branch: Option<String>,
    ) -> GitBridgeResult<String> {
        let command = GitCommand::Pull {
            repository_path: repository_path.to_string(),
            remote,
            branch,
        };
        let name = command.name();
        let value = self.invoke(command).await?;
        reply_text(&value, "message")
            .ok_or_else(|| GitBridgeError::decode(name, "expected pull summary"))
    }

    async fn commit(
        &self,
        repository_path: &str,
        message: &str,
        files: Vec<String>,
    ) -> GitBridgeResult<String> {
        let command = GitCommand::Commit {
            repository_path: repository_path.to_string(),
            message: message.to_string(),
            files,
        };
        let name = command.name();
        let value = self.invoke(command).await?;
        reply_text(&value, "sha").ok_or_else(|| GitBridgeError::decode(name, "expected commit id"))
    }

    async fn push(
        &self,
        repository_path: &str,
        remote: Option<String>,
        branch: Option<String>,
    ) -> GitBridgeResult<String> {
        let command = GitCommand::Push {
            repository_path: repository_path.to_string(),
            remote,
            branch,
        };
        let name = command.name();
        let value = self.invoke(command).await?;
        reply_text(&value, "message")
            .ok_or_else(|| GitBridgeError::decode(name, "expected push summary"))
    }
}

impl<T: GitBridge + ?Sized> GitBridgeExt for T {}

/// Bridge for runtimes without a git backend. Every command is unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableGitBridge;

#[async_trait]
impl GitBridge for UnavailableGitBridge {
    async fn invoke(&self, command: GitCommand) -> GitBridgeResult<Value> {
        Err(GitBridgeError::unavailable(command.name()))
    }
}
