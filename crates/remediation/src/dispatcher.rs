//! Remediation dispatcher (§4.H): validates a runbook execution request,
//! gates it behind approval when required, and drives execution through
//! the `Executor` collaborator to a terminal state.

use crate::models::{ApprovalRequest, RemediationExecution, Runbook};
use crate::notifications::NotificationService;
use crate::repository::{ApprovalRepository, RemediationExecutionRepository, RunbookRepository};
use crate::traits::Executor;
use sentry_auth::User;
use sentry_core::{
    ApprovalRequestId, ApprovalStatus, AuditLogger, EventBus, IncidentId, IncidentStatus,
    RemediationExecutionId, RemediationStatus, Resolution, Result, RiskLevel, RunbookId,
    TenantId, Topic,
};
use sentry_incidents::{IncidentRepository, SignatureStatsRepository};
use std::sync::Arc;
use std::time::Duration;

/// One hour, per §4.H step 3.
const APPROVAL_TTL_SECONDS: i64 = 3600;
/// Exponential backoff schedule for transient executor submission errors
/// (§4.H "Retries"): 1s, 2s, 4s, at most 3 attempts total.
const SUBMIT_RETRY_ATTEMPTS: u32 = 3;
/// Poll schedule for an in-flight command (§4.H step 6): 2s, 4s, 8s, ...
/// capped at 60s, until terminal or the 30-minute wall-clock timeout.
const POLL_INITIAL: Duration = Duration::from_secs(2);
const POLL_CAP: Duration = Duration::from_secs(60);
const EXECUTION_TIMEOUT: Duration = Duration::from_secs(30 * 60);
/// Wall-clock budget for §4.H step 7's post-success health checks; these
/// run against the same executor so they share the poll schedule above.
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5 * 60);
/// §3: stdout/stderr are each truncated to 64 KiB before being persisted.
const MAX_OUTPUT_BYTES: usize = 64 * 1024;

fn truncate_output(output: String) -> String {
    if output.len() <= MAX_OUTPUT_BYTES {
        return output;
    }
    let mut end = MAX_OUTPUT_BYTES;
    while end > 0 && !output.is_char_boundary(end) {
        end -= 1;
    }
    output[..end].to_string()
}

#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// Execution is underway; a background poller should call
    /// `Dispatcher::poll_to_completion` with this execution id.
    Executing { execution_id: RemediationExecutionId },
    /// A medium/high-risk runbook without `auto_approve` was gated; the
    /// dispatcher returns immediately without blocking (§4.H step 3).
    PendingApproval { approval_id: ApprovalRequestId },
}

pub struct Dispatcher {
    runbooks: RunbookRepository,
    approvals: ApprovalRepository,
    executions: RemediationExecutionRepository,
    incidents: IncidentRepository,
    signature_stats: SignatureStatsRepository,
    notifications: NotificationService,
    executor: Arc<dyn Executor>,
    event_bus: Arc<EventBus>,
    audit: Arc<AuditLogger>,
}

impl Dispatcher {
    pub fn new(
        runbooks: RunbookRepository,
        approvals: ApprovalRepository,
        executions: RemediationExecutionRepository,
        incidents: IncidentRepository,
        signature_stats: SignatureStatsRepository,
        notifications: NotificationService,
        executor: Arc<dyn Executor>,
        event_bus: Arc<EventBus>,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            runbooks,
            approvals,
            executions,
            incidents,
            signature_stats,
            notifications,
            executor,
            event_bus,
            audit,
        }
    }

    /// §4.H steps 1-3 (validation, and the approval gate when required), or
    /// steps 4-5 (begin execution) when no gate applies.
    pub async fn dispatch(
        &self,
        tenant_id: TenantId,
        incident_id: IncidentId,
        runbook_id: RunbookId,
        requester: &User,
        target_hosts: &[String],
    ) -> Result<DispatchOutcome> {
        let incident = self
            .incidents
            .get_by_id(tenant_id, incident_id)
            .await?
            .ok_or_else(|| sentry_core::Error::not_found("incident not found"))?;

        let runbook = self
            .runbooks
            .get_by_id(tenant_id, runbook_id)
            .await?
            .ok_or_else(|| sentry_core::Error::not_found("runbook not found"))?;

        if !runbook.matches_incident_signature(&incident.signature) {
            return Err(sentry_core::Error::validation(
                "runbook signature does not match incident signature",
            ));
        }

        if !requester.role.at_least(runbook.risk.minimum_role()) {
            return Err(sentry_core::Error::forbidden(
                "requester's role is below the minimum for this runbook's risk level",
            ));
        }

        if matches!(runbook.risk, RiskLevel::Medium | RiskLevel::High) && !runbook.auto_approve {
            let now = chrono::Utc::now().timestamp();
            let approval = ApprovalRequest {
                id: ApprovalRequestId::new(),
                tenant_id,
                incident_id,
                runbook_id,
                requested_by: requester.id,
                risk: runbook.risk,
                status: ApprovalStatus::Pending,
                target_hosts: target_hosts.to_vec(),
                notes: None,
                decided_by: None,
                created_at: now,
                expires_at: now + APPROVAL_TTL_SECONDS,
                decided_at: None,
                version: 0,
            };
            self.approvals.insert(&approval).await?;
            let applied = self
                .incidents
                .update(
                    tenant_id,
                    incident_id,
                    incident.version,
                    serde_json::json!({ "status": IncidentStatus::PendingApproval }),
                )
                .await?;
            if !applied {
                return Err(sentry_core::Error::conflict(
                    "incident was modified concurrently while gating for approval",
                ));
            }

            let approver_role = runbook.risk.minimum_role();
            self.notifications
                .notify_role(
                    tenant_id,
                    approver_role,
                    "approval_requested",
                    &format!("Runbook {} needs approval for incident {}", runbook.name, incident_id),
                )
                .await?;

            self.audit
                .log(AuditLogger::entry(
                    tenant_id,
                    Some(requester.id),
                    "approval_requested",
                    "approval_request",
                    Some(approval.id.0),
                    sentry_core::AuditStatus::Success,
                    None,
                ))
                .await;
            self.event_bus.publish(
                Topic::ApprovalRequested,
                tenant_id,
                serde_json::to_value(&approval)?,
            );

            return Ok(DispatchOutcome::PendingApproval {
                approval_id: approval.id,
            });
        }

        self.begin_execution(tenant_id, &incident, &runbook, target_hosts)
            .await
    }

    /// §4.H steps 4-5: runs once a low-risk request clears validation, or
    /// once an approval decision resolves to `approved`.
    pub async fn begin_execution(
        &self,
        tenant_id: TenantId,
        incident: &sentry_incidents::Incident,
        runbook: &Runbook,
        target_hosts: &[String],
    ) -> Result<DispatchOutcome> {
        let applied = self
            .incidents
            .update(
                tenant_id,
                incident.id,
                incident.version,
                serde_json::json!({ "status": IncidentStatus::Remediating }),
            )
            .await?;
        if !applied {
            return Err(sentry_core::Error::conflict(
                "incident was modified concurrently before execution could begin",
            ));
        }

        let command_id = self.submit_with_retry(runbook, target_hosts).await?;
        let now = chrono::Utc::now().timestamp();
        let execution = RemediationExecution {
            id: RemediationExecutionId::new(),
            tenant_id,
            incident_id: incident.id,
            runbook_id: runbook.id,
            command_id,
            instance_ids: target_hosts.to_vec(),
            status: RemediationStatus::InProgress,
            stdout_truncated: String::new(),
            stderr_truncated: String::new(),
            started_at: now,
            finished_at: None,
            duration_seconds: None,
            version: 0,
        };
        self.executions.insert(&execution).await?;

        Ok(DispatchOutcome::Executing {
            execution_id: execution.id,
        })
    }

    async fn submit_with_retry(&self, runbook: &Runbook, target_hosts: &[String]) -> Result<String> {
        let mut attempt = 0;
        let mut backoff = Duration::from_secs(1);
        loop {
            match self
                .executor
                .execute(&runbook.actions, target_hosts, EXECUTION_TIMEOUT.as_secs())
                .await
            {
                Ok(command_id) => return Ok(command_id),
                Err(e) if e.is_retryable() && attempt + 1 < SUBMIT_RETRY_ATTEMPTS => {
                    attempt += 1;
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// §4.H step 7: runs a runbook's health checks, if any, through the
    /// same executor and requires every one to terminate successfully
    /// within `HEALTH_CHECK_TIMEOUT`. A runbook with no health checks
    /// passes trivially.
    async fn health_checks_pass(&self, runbook: &Runbook, instance_ids: &[String]) -> Result<bool> {
        if runbook.health_checks.is_empty() {
            return Ok(true);
        }

        let command_id = self
            .executor
            .execute(&runbook.health_checks, instance_ids, HEALTH_CHECK_TIMEOUT.as_secs())
            .await?;

        let start = std::time::Instant::now();
        let mut interval = POLL_INITIAL;
        loop {
            let report = self.executor.status(&command_id).await?;
            if report.status.is_terminal() {
                return Ok(report.status == RemediationStatus::Success);
            }
            if start.elapsed() >= HEALTH_CHECK_TIMEOUT {
                return Ok(false);
            }
            tokio::time::sleep(interval).await;
            interval = (interval * 2).min(POLL_CAP);
        }
    }

    /// §4.H steps 6-8: polls the executor at increasing intervals until a
    /// terminal status or the 30-minute wall-clock timeout, then resolves
    /// the incident accordingly. Intended to run as a spawned background
    /// task — this call blocks its own task for as long as the runbook
    /// takes, never the caller that triggered `dispatch`.
    pub async fn poll_to_completion(
        &self,
        tenant_id: TenantId,
        incident_id: IncidentId,
        assigned_to: Option<sentry_core::UserId>,
        execution: RemediationExecution,
    ) -> Result<RemediationStatus> {
        let start = std::time::Instant::now();
        let mut interval = POLL_INITIAL;

        loop {
            if start.elapsed() >= EXECUTION_TIMEOUT {
                return self
                    .finish(
                        tenant_id,
                        incident_id,
                        assigned_to,
                        execution,
                        RemediationStatus::Timeout,
                        String::new(),
                        String::new(),
                    )
                    .await;
            }

            let report = self.executor.status(&execution.command_id).await?;
            if report.status.is_terminal() {
                return self
                    .finish(
                        tenant_id,
                        incident_id,
                        assigned_to,
                        execution,
                        report.status,
                        report.stdout,
                        report.stderr,
                    )
                    .await;
            }

            tokio::time::sleep(interval).await;
            interval = (interval * 2).min(POLL_CAP);
        }
    }

    async fn finish(
        &self,
        tenant_id: TenantId,
        incident_id: IncidentId,
        assigned_to: Option<sentry_core::UserId>,
        mut execution: RemediationExecution,
        status: RemediationStatus,
        stdout: String,
        stderr: String,
    ) -> Result<RemediationStatus> {
        let now = chrono::Utc::now().timestamp();

        execution.status = status;
        execution.stdout_truncated = truncate_output(stdout);
        execution.stderr_truncated = truncate_output(stderr);
        execution.finished_at = Some(now);
        execution.duration_seconds = Some(now - execution.started_at);
        self.executions
            .update(
                tenant_id,
                execution.id,
                serde_json::json!({
                    "status": status,
                    "stdout_truncated": execution.stdout_truncated,
                    "stderr_truncated": execution.stderr_truncated,
                    "finished_at": execution.finished_at,
                    "duration_seconds": execution.duration_seconds,
                }),
            )
            .await?;

        let incident = self
            .incidents
            .get_by_id(tenant_id, incident_id)
            .await?
            .ok_or_else(|| sentry_core::Error::not_found("incident not found"))?;

        let resolved = if status == RemediationStatus::Success {
            let runbook = self.runbooks.get_by_id(tenant_id, execution.runbook_id).await?;
            match runbook {
                Some(runbook) => self.health_checks_pass(&runbook, &execution.instance_ids).await?,
                None => true,
            }
        } else {
            false
        };

        let patch = if resolved {
            serde_json::json!({
                "status": IncidentStatus::Resolved,
                "resolution": Resolution::Auto,
                "resolved_at": now,
                "sla_deadline": serde_json::Value::Null,
            })
        } else {
            serde_json::json!({
                "status": IncidentStatus::InProgress,
                "resolution": Resolution::Unresolved,
            })
        };
        let applied = self
            .incidents
            .update(tenant_id, incident_id, incident.version, patch)
            .await?;
        if !applied {
            return Err(sentry_core::Error::conflict(
                "incident was modified concurrently while recording remediation outcome",
            ));
        }

        if resolved {
            if let Some(user_id) = assigned_to {
                self.signature_stats
                    .record_handled(tenant_id, user_id, &incident.signature, now)
                    .await?;
            }
        }

        if !resolved {
            if let Some(user_id) = assigned_to {
                self.notifications
                    .notify_user(
                        tenant_id,
                        user_id,
                        "remediation_failed",
                        &format!("Runbook execution {} on incident {} needs attention", execution.id, incident_id),
                    )
                    .await?;
            }
        }

        self.audit
            .log(AuditLogger::entry(
                tenant_id,
                None,
                "runbook_executed",
                "remediation_execution",
                Some(execution.id.0),
                sentry_core::AuditStatus::Success,
                Some(serde_json::json!({ "status": status })),
            ))
            .await;
        self.event_bus.publish(
            Topic::RemediationCompleted,
            tenant_id,
            serde_json::to_value(&execution)?,
        );

        Ok(status)
    }
}
