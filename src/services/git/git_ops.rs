//! Git Operations
//!
//! Thin wrapper around the `git` CLI used by the CLI bridge. All calls are
//! synchronous; async callers run them on a blocking thread.

use std::path::Path;
use std::process::Command;

use crate::models::snapshot::{CommitSummary, RemoteSummary, RepositorySummary, StatusEntry};
use crate::utils::error::{AppError, AppResult};

/// Result of a git command execution
#[derive(Debug)]
pub struct GitResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl GitResult {
    /// Check if the command was successful and return stdout or error
    pub fn into_result(self) -> AppResult<String> {
        if self.success {
            Ok(self.stdout)
        } else {
            Err(AppError::git(format!(
                "git exited with {}: {}",
                self.exit_code,
                self.stderr.trim()
            )))
        }
    }
}

/// Git CLI wrapper
#[derive(Debug, Default, Clone, Copy)]
pub struct GitOps;

impl GitOps {
    pub fn new() -> Self {
        Self
    }

    /// Execute a git command in the specified directory
    pub fn execute(&self, cwd: &Path, args: &[&str]) -> AppResult<GitResult> {
        let output = Command::new("git")
            .args(args)
            .current_dir(cwd)
            // Never wait on a credential prompt.
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("GCM_INTERACTIVE", "never")
            .output()
            .map_err(|e| AppError::git(format!("Failed to execute git: {}", e)))?;

        Ok(GitResult {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    /// Current branch name (`HEAD` when detached)
    pub fn current_branch(&self, cwd: &Path) -> AppResult<String> {
        self.execute(cwd, &["rev-parse", "--abbrev-ref", "HEAD"])?
            .into_result()
            .map(|s| s.trim().to_string())
    }

    /// Last commit on HEAD, `None` for a repository without commits
    pub fn last_commit(&self, cwd: &Path) -> AppResult<Option<CommitSummary>> {
        let result = self.execute(cwd, &["log", "-1", "--format=%H%x00%s%x00%an%x00%aI"])?;
        if !result.success {
            return Ok(None);
        }
        Ok(parse_commit_line(result.stdout.trim()))
    }

    /// Remote tracked by the current branch, falling back to `origin`
    pub fn tracking_remote(&self, cwd: &Path) -> AppResult<Option<RemoteSummary>> {
        let upstream = self.execute(
            cwd,
            &["rev-parse", "--abbrev-ref", "--symbolic-full-name", "@{u}"],
        )?;

        let (name, branch) = if upstream.success {
            match upstream.stdout.trim().split_once('/') {
                Some((remote, branch)) => (remote.to_string(), Some(branch.to_string())),
                None => (upstream.stdout.trim().to_string(), None),
            }
        } else {
            ("origin".to_string(), None)
        };

        let url = self.execute(cwd, &["remote", "get-url", &name])?;
        if !url.success {
            return Ok(None);
        }

        Ok(Some(RemoteSummary {
            name,
            url: url.stdout.trim().to_string(),
            branch,
        }))
    }

    /// Branch, last commit and remote in one call
    pub fn repository_summary(&self, cwd: &Path) -> AppResult<RepositorySummary> {
        Ok(RepositorySummary {
            branch: self.current_branch(cwd)?,
            last_commit: self.last_commit(cwd)?,
            remote: self.tracking_remote(cwd)?,
        })
    }

    /// Working tree status (`git status --porcelain`)
    pub fn status(&self, cwd: &Path) -> AppResult<Vec<StatusEntry>> {
        let output = self
            .execute(cwd, &["status", "--porcelain"])?
            .into_result()?;
        Ok(parse_porcelain_v1(&output))
    }

    /// Diff of one file, working tree against HEAD
    pub fn diff_file(&self, cwd: &Path, path: &str) -> AppResult<String> {
        let result = self.execute(cwd, &["diff", "HEAD", "--", path])?;
        if result.success {
            return Ok(result.stdout);
        }
        // Repository without commits: fall back to the index diff.
        self.execute(cwd, &["diff", "--", path])?.into_result()
    }

    /// Stage paths (all changes when empty) and commit. Returns the new SHA.
    pub fn commit(&self, cwd: &Path, message: &str, files: &[String]) -> AppResult<String> {
        if files.is_empty() {
            self.execute(cwd, &["add", "-A"])?.into_result()?;
        } else {
            let mut args = vec!["add", "--"];
            args.extend(files.iter().map(String::as_str));
            self.execute(cwd, &args)?.into_result()?;
        }

        let result = self.execute(cwd, &["commit", "-m", message])?;
        if !result.success {
            return Err(AppError::git(format!(
                "Commit failed: {}",
                result.stderr.trim()
            )));
        }

        self.execute(cwd, &["rev-parse", "HEAD"])?
            .into_result()
            .map(|s| s.trim().to_string())
    }

    /// Pull from a remote. Returns git's summary output.
    pub fn pull(&self, cwd: &Path, remote: Option<&str>, branch: Option<&str>) -> AppResult<String> {
        let mut args = vec!["pull", "--ff-only"];
        args.extend(remote_args(remote, branch));
        self.execute(cwd, &args)?
            .into_result()
            .map(|s| s.trim().to_string())
    }

    /// Push to a remote. Git reports progress on stderr.
    pub fn push(&self, cwd: &Path, remote: Option<&str>, branch: Option<&str>) -> AppResult<String> {
        let mut args = vec!["push"];
        args.extend(remote_args(remote, branch));
        let result = self.execute(cwd, &args)?;
        let stderr = result.stderr.trim().to_string();
        result.into_result()?;
        Ok(stderr)
    }

    /// Clone `url` into `destination`, relative to `cwd`
    pub fn clone_repository(&self, cwd: &Path, url: &str, destination: &str) -> AppResult<()> {
        self.execute(cwd, &["clone", url, destination])?
            .into_result()?;
        Ok(())
    }

    /// Tracked files
    pub fn list_files(&self, cwd: &Path) -> AppResult<Vec<String>> {
        let output = self.execute(cwd, &["ls-files"])?.into_result()?;
        Ok(output
            .lines()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect())
    }
}

/// `[remote] [branch]` arguments; a branch without a remote targets `origin`.
fn remote_args<'a>(remote: Option<&'a str>, branch: Option<&'a str>) -> Vec<&'a str> {
    let remote = remote.or(branch.map(|_| "origin"));
    remote.into_iter().chain(branch).collect()
}

fn parse_commit_line(line: &str) -> Option<CommitSummary> {
    let parts: Vec<&str> = line.splitn(4, '\0').collect();
    if parts.len() < 4 || parts[0].is_empty() {
        return None;
    }
    Some(CommitSummary {
        id: parts[0].to_string(),
        message: parts[1].to_string(),
        author: parts[2].to_string(),
        time: parts[3].to_string(),
    })
}

const CONFLICT_CODES: [&str; 7] = ["DD", "AU", "UD", "UA", "DU", "AA", "UU"];

/// Parse `git status --porcelain` (v1) output.
pub fn parse_porcelain_v1(output: &str) -> Vec<StatusEntry> {
    output
        .lines()
        .filter(|line| line.len() > 3)
        .filter_map(|line| {
            let code = line.get(0..2)?;
            let rest = line.get(3..)?;
            // Renames and copies are reported as "orig -> new".
            let path = match rest.split_once(" -> ") {
                Some((_, new_path)) => new_path,
                None => rest,
            };
            let mut chars = code.chars();
            let index = chars.next().filter(|c| *c != ' ').map(String::from);
            let workdir = chars.next().filter(|c| *c != ' ').map(String::from);

            Some(StatusEntry {
                path: path.trim_matches('"').to_string(),
                index,
                workdir,
                is_conflicted: CONFLICT_CODES.contains(&code),
            })
        })
        .collect()
}
