//! Production stand-ins for the external collaborator traits (§6
//! `Executor`/`DecisionAdvisor`/`Notifier`) that the `sentry-remediation`
//! crate deliberately ships with no implementation. A real deployment
//! wires its own runbook executor against whatever automation backend it
//! has (SSM, Ansible, a config-management API); until one is configured
//! this logs the dispatch and reports immediate success, the same role the
//! teacher's `email.provider = "mock"` setting plays for outbound mail in
//! development.

use async_trait::async_trait;
use sentry_core::Result;
use sentry_remediation::{ExecutorStatusReport, Executor};
use uuid::Uuid;

pub struct NoopExecutor;

#[async_trait]
impl Executor for NoopExecutor {
    async fn execute(
        &self,
        commands: &[String],
        instance_ids: &[String],
        _timeout_seconds: u64,
    ) -> Result<String> {
        let command_id = Uuid::new_v4().to_string();
        tracing::warn!(
            command_id = %command_id,
            commands = ?commands,
            instance_ids = ?instance_ids,
            "no runbook executor configured; reporting no-op success"
        );
        Ok(command_id)
    }

    async fn status(&self, command_id: &str) -> Result<ExecutorStatusReport> {
        tracing::debug!(command_id, "no-op executor reports immediate completion");
        Ok(ExecutorStatusReport {
            status: sentry_core::RemediationStatus::Success,
            stdout: String::new(),
            stderr: String::new(),
            finished_at: Some(chrono::Utc::now().timestamp()),
        })
    }
}
