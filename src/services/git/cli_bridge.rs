//! Git CLI Bridge
//!
//! `GitBridge` backed by the local `git` binary. Every command runs on a
//! blocking thread; network commands are additionally bounded by a timeout.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::bridge::{GitBridge, GitBridgeError, GitBridgeResult, GitCommand};
use super::git_ops::GitOps;
use crate::utils::error::AppResult;

/// Default timeout for pull/push/clone.
const NETWORK_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone)]
pub struct GitCliBridge {
    git: GitOps,
    network_timeout: Duration,
}

impl Default for GitCliBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl GitCliBridge {
    pub fn new() -> Self {
        Self {
            git: GitOps::new(),
            network_timeout: Duration::from_secs(NETWORK_TIMEOUT_SECS),
        }
    }

    /// Builder pattern: set the timeout for network commands
    pub fn with_network_timeout(mut self, timeout: Duration) -> Self {
        self.network_timeout = timeout;
        self
    }

    fn run(git: GitOps, command: GitCommand) -> AppResult<Value> {
        let cwd = PathBuf::from(command.repository_path());
        match command {
            GitCommand::GetRepositoryContext { .. } => {
                Ok(serde_json::to_value(git.repository_summary(&cwd)?)?)
            }
            GitCommand::RepositoryStatus { .. } => Ok(serde_json::to_value(git.status(&cwd)?)?),
            GitCommand::GetFileDiff { path, .. } => Ok(Value::String(git.diff_file(&cwd, &path)?)),
            GitCommand::Commit { message, files, .. } => {
                let sha = git.commit(&cwd, &message, &files)?;
                Ok(json!({ "sha": sha }))
            }
            GitCommand::Push { remote, branch, .. } => {
                let message = git.push(&cwd, remote.as_deref(), branch.as_deref())?;
                Ok(json!({ "message": message }))
            }
            GitCommand::Pull { remote, branch, .. } => {
                let message = git.pull(&cwd, remote.as_deref(), branch.as_deref())?;
                Ok(json!({ "message": message }))
            }
            GitCommand::Clone {
                url, destination, ..
            } => {
                git.clone_repository(&cwd, &url, &destination)?;
                Ok(json!({ "destination": destination }))
            }
            GitCommand::ListRepositoryFiles { .. } => {
                Ok(serde_json::to_value(git.list_files(&cwd)?)?)
            }
            // Hosting-service commands are rejected before dispatch.
            GitCommand::CreatePullRequest { .. } | GitCommand::ListUserRepos { .. } => {
                Ok(Value::Null)
            }
        }
    }
}

fn is_network_command(command: &GitCommand) -> bool {
    matches!(
        command,
        GitCommand::Push { .. } | GitCommand::Pull { .. } | GitCommand::Clone { .. }
    )
}

#[async_trait]
impl GitBridge for GitCliBridge {
    async fn invoke(&self, command: GitCommand) -> GitBridgeResult<Value> {
        let name = command.name();
        if matches!(
            command,
            GitCommand::CreatePullRequest { .. } | GitCommand::ListUserRepos { .. }
        ) {
            return Err(GitBridgeError::unavailable(name));
        }

        let network = is_network_command(&command);
        tracing::debug!(command = name, path = command.repository_path(), "git bridge invoke");

        let git = self.git;
        let task = tokio::task::spawn_blocking(move || Self::run(git, command));

        let joined = if network {
            match tokio::time::timeout(self.network_timeout, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    return Err(GitBridgeError::failed(
                        name,
                        format!(
                            "timed out after {} seconds",
                            self.network_timeout.as_secs()
                        ),
                    ))
                }
            }
        } else {
            task.await
        };

        match joined {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(GitBridgeError::failed(name, e.to_string())),
            Err(e) => Err(GitBridgeError::failed(
                name,
                format!("git task panicked: {}", e),
            )),
        }
    }
}
