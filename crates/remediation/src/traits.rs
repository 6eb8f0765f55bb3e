//! External collaborator interfaces (§6), named only by the contract they
//! expose. No implementation lives in this workspace; production wiring
//! supplies one, tests supply a double.

use async_trait::async_trait;
use sentry_core::{RemediationStatus, Result};

/// A single poll of an in-flight remediation command.
#[derive(Debug, Clone)]
pub struct ExecutorStatusReport {
    pub status: RemediationStatus,
    pub stdout: String,
    pub stderr: String,
    pub finished_at: Option<i64>,
}

/// `execute(commands, instance_ids, timeout) -> command_id`;
/// `status(command_id) -> {status, stdout, stderr, finished_at}`. Must be
/// idempotent on `command_id`.
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(
        &self,
        commands: &[String],
        instance_ids: &[String],
        timeout_seconds: u64,
    ) -> Result<String>;

    async fn status(&self, command_id: &str) -> Result<ExecutorStatusReport>;
}

#[derive(Debug, Clone)]
pub struct AdvisorDecision {
    pub recommendation: String,
    pub confidence: f64,
    pub tool_calls: Vec<String>,
    pub reasoning: String,
}

/// `decide(incident_snapshot, memory_context) -> {recommendation,
/// confidence, tool_calls, reasoning}`. Optional collaborator; nothing in
/// this crate requires one to be configured. The streaming variant from §6
/// (a sequence of partial strings terminated by `end`) is a transport-level
/// concern for whichever handler exposes this over the wire, not part of
/// this trait's contract.
#[async_trait]
pub trait DecisionAdvisor: Send + Sync {
    async fn decide(
        &self,
        incident_snapshot: serde_json::Value,
        memory_context: serde_json::Value,
    ) -> Result<AdvisorDecision>;
}

/// `send(recipient, subject, body) -> {id, status}`; any failure is logged
/// but never blocks the core path (§6).
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<String>;
}
