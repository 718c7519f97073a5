//! In-memory fakes of the backend seams shared by the integration tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use changeflow::services::git::{GitBridge, GitBridgeError, GitBridgeResult, GitCommand};
use changeflow_core::StreamEvent;
use changeflow_llm::{
    ChatInvoker, ChatMessage, ChatReply, ChatRequest, LlmError, LlmResult, ProviderFetch,
    ProviderFetchOutcome, ProviderFetchRequest,
};

// ============================================================================
// Git
// ============================================================================

pub struct FakeGit {
    context: Value,
    status: Value,
    diffs: HashMap<String, String>,
    failing: Vec<&'static str>,
    calls: Mutex<Vec<GitCommand>>,
}

impl Default for FakeGit {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeGit {
    pub fn new() -> Self {
        Self {
            context: json!({
                "branch": "main",
                "lastCommit": {"id": "abc123", "message": "Initial commit", "author": "Dev", "time": "2024-01-01T00:00:00Z"},
                "remote": {"name": "origin", "url": "git@example.com:org/repo.git", "branch": "main"}
            }),
            status: json!([]),
            diffs: HashMap::new(),
            failing: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Modified working-tree entries, in order.
    pub fn with_status(mut self, paths: &[&str]) -> Self {
        self.status = Value::Array(
            paths
                .iter()
                .map(|p| json!({"path": p, "index": null, "workdir": "M", "isConflicted": false}))
                .collect(),
        );
        self
    }

    pub fn with_diff(mut self, path: &str, diff: &str) -> Self {
        self.diffs.insert(path.to_string(), diff.to_string());
        self
    }

    /// Make a command (by wire name) fail.
    pub fn failing(mut self, command: &'static str) -> Self {
        self.failing.push(command);
        self
    }

    pub fn call_names(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().iter().map(|c| c.name()).collect()
    }

    pub fn diff_requests(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                GitCommand::GetFileDiff { path, .. } => Some(path.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl GitBridge for FakeGit {
    async fn invoke(&self, command: GitCommand) -> GitBridgeResult<Value> {
        let name = command.name();
        self.calls.lock().unwrap().push(command.clone());
        if self.failing.contains(&name) {
            return Err(GitBridgeError::failed(name, "simulated failure"));
        }
        match command {
            GitCommand::GetRepositoryContext { .. } => Ok(self.context.clone()),
            GitCommand::RepositoryStatus { .. } => Ok(self.status.clone()),
            GitCommand::GetFileDiff { path, .. } => Ok(Value::String(
                self.diffs.get(&path).cloned().unwrap_or_default(),
            )),
            GitCommand::Pull { .. } => Ok(json!({"message": "Already up to date."})),
            _ => Err(GitBridgeError::unavailable(name)),
        }
    }
}

// ============================================================================
// Local model runtime
// ============================================================================

pub enum Step {
    Reply(String),
    Stream(Vec<StreamEvent>),
    Fail(String),
    /// Reply after the given delay in milliseconds
    Slow(u64, String),
}

pub struct ScriptedInvoker {
    steps: Mutex<VecDeque<Step>>,
    calls: AtomicUsize,
}

impl ScriptedInvoker {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn replying(content: &str) -> Self {
        Self::new(vec![Step::Reply(content.to_string())])
    }

    /// Fails every call.
    pub fn offline() -> Self {
        Self::new(Vec::new())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatInvoker for ScriptedInvoker {
    async fn invoke(&self, _request: ChatRequest) -> LlmResult<ChatReply> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Reply(content)) => Ok(ChatReply::Message(ChatMessage::assistant(content))),
            Some(Step::Stream(events)) => Ok(ChatReply::Stream(Box::pin(
                futures_util::stream::iter(events),
            ))),
            Some(Step::Fail(message)) => Err(LlmError::NetworkError { message }),
            Some(Step::Slow(delay_ms, content)) => {
                tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                Ok(ChatReply::Message(ChatMessage::assistant(content)))
            }
            None => Err(LlmError::ProviderUnavailable {
                message: "runtime offline".to_string(),
            }),
        }
    }
}

// ============================================================================
// Cloud provider bridge
// ============================================================================

pub struct ScriptedFetch {
    outcomes: Mutex<VecDeque<Result<ProviderFetchOutcome, String>>>,
    requests: Mutex<Vec<ProviderFetchRequest>>,
}

impl ScriptedFetch {
    pub fn new(outcomes: Vec<Result<ProviderFetchOutcome, String>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Throws on every call.
    pub fn offline() -> Self {
        Self::new(Vec::new())
    }

    pub fn requests(&self) -> Vec<ProviderFetchRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProviderFetch for ScriptedFetch {
    async fn fetch(&self, request: ProviderFetchRequest) -> LlmResult<ProviderFetchOutcome> {
        self.requests.lock().unwrap().push(request);
        let outcome = self.outcomes.lock().unwrap().pop_front();
        match outcome {
            Some(Ok(outcome)) => Ok(outcome),
            Some(Err(message)) => Err(LlmError::NetworkError { message }),
            None => Err(LlmError::NetworkError {
                message: "connection refused".to_string(),
            }),
        }
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// A provider reply matching the documented output schema.
pub fn schema_payload() -> Value {
    json!({
        "finalPrompt": "Refined: update the README",
        "plan": {
            "summary": "Refresh the README",
            "intent": "documentation",
            "safeguards": {"dryRun": true, "manualApproval": true, "notes": []},
            "steps": [
                {"id": "s1", "action": "inspect", "description": "Read the README", "targetPath": "README.md",
                 "requiresApproval": false, "approved": true, "notes": []},
                {"id": "s2", "action": "modify", "description": "Rewrite the intro", "targetPath": "README.md",
                 "requiresApproval": true, "approved": null, "confidence": 0.8, "notes": ["keep badges"],
                 "providerMetadata": {"providerId": "ollama", "modelId": "llama3.1"}},
                {"id": "s3", "action": "commit", "description": "Commit the change",
                 "requiresApproval": false, "approved": null, "notes": []}
            ]
        },
        "patches": [{"path": "README.md", "diff": "--- a/README.md\n+++ b/README.md\n@@ -1 +1 @@\n-old\n+new\n", "summary": "intro"}],
        "commits": [{"message": "docs: refresh README", "files": ["README.md"]}],
        "pullRequest": {"title": "Refresh README", "summary": "Docs only"}
    })
}

pub fn fenced(payload: &Value) -> String {
    format!(
        "Here is the plan:\n```json\n{}\n```\nLet me know.",
        serde_json::to_string_pretty(payload).unwrap()
    )
}
