//! Approval workflow (§4.I): a CAS state machine over `ApprovalRequest`.
//! `pending -> approved` lets the dispatcher resume execution;
//! `pending -> rejected` and the lazy `pending -> expired` read-time
//! transition both return the incident to `in_progress` and notify the
//! requester.

use crate::models::ApprovalRequest;
use crate::notifications::NotificationService;
use crate::repository::ApprovalRepository;
use sentry_core::{
    ApprovalRequestId, ApprovalStatus, AuditLogger, AuditStatus, Error, IncidentStatus,
    Resolution, Result, TenantId, UserId,
};
use sentry_incidents::IncidentRepository;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

pub struct ApprovalWorkflow {
    approvals: ApprovalRepository,
    incidents: IncidentRepository,
    notifications: NotificationService,
    audit: Arc<AuditLogger>,
}

impl ApprovalWorkflow {
    pub fn new(
        approvals: ApprovalRepository,
        incidents: IncidentRepository,
        notifications: NotificationService,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            approvals,
            incidents,
            notifications,
            audit,
        }
    }

    /// Reads an approval request, lazily resolving `pending -> expired`
    /// (§4.I: "any read after `expires_at`") before handing it back. This is
    /// a pure read-time check against `ApprovalRequest::is_expired`, not the
    /// storage facade's TTL-hide convention — see the `decision_deadline`
    /// rename on the model.
    pub async fn get(
        &self,
        tenant_id: TenantId,
        id: ApprovalRequestId,
        now: i64,
    ) -> Result<Option<ApprovalRequest>> {
        let Some(mut approval) = self.approvals.get_by_id(tenant_id, id).await? else {
            return Ok(None);
        };
        if approval.is_expired(now) {
            self.expire(tenant_id, &mut approval, now).await?;
        }
        Ok(Some(approval))
    }

    async fn expire(&self, tenant_id: TenantId, approval: &mut ApprovalRequest, now: i64) -> Result<()> {
        let applied = self
            .approvals
            .transition(
                tenant_id,
                approval.id,
                approval.version,
                serde_json::json!({ "status": ApprovalStatus::Expired, "decided_at": now }),
            )
            .await?;
        if applied {
            approval.status = ApprovalStatus::Expired;
            approval.decided_at = Some(now);
            approval.version += 1;
            self.return_incident_to_in_progress(tenant_id, approval).await?;
            self.notifications
                .notify_user(
                    tenant_id,
                    approval.requested_by,
                    "approval_expired",
                    &format!("Approval request for incident {} expired", approval.incident_id),
                )
                .await?;
        }
        // If the CAS lost the race, another reader already resolved it —
        // nothing further to do here.
        Ok(())
    }

    /// `pending -> approved` or `pending -> rejected`. First write wins;
    /// a concurrent decider on the same request sees a conflict.
    pub async fn decide(
        &self,
        tenant_id: TenantId,
        id: ApprovalRequestId,
        decision: Decision,
        decided_by: UserId,
        notes: Option<String>,
        now: i64,
    ) -> Result<ApprovalRequest> {
        let Some(mut approval) = self.get(tenant_id, id, now).await? else {
            return Err(Error::not_found("approval request not found"));
        };
        if approval.status != ApprovalStatus::Pending {
            return Err(Error::conflict(
                "approval request is no longer pending",
            ));
        }

        let new_status = match decision {
            Decision::Approve => ApprovalStatus::Approved,
            Decision::Reject => ApprovalStatus::Rejected,
        };
        let applied = self
            .approvals
            .transition(
                tenant_id,
                approval.id,
                approval.version,
                serde_json::json!({
                    "status": new_status,
                    "decided_by": decided_by,
                    "decided_at": now,
                    "notes": notes,
                }),
            )
            .await?;
        if !applied {
            return Err(Error::conflict(
                "approval request was decided concurrently by another approver",
            ));
        }

        approval.status = new_status;
        approval.decided_by = Some(decided_by);
        approval.decided_at = Some(now);
        approval.notes = notes;
        approval.version += 1;

        self.audit
            .log(AuditLogger::entry(
                tenant_id,
                Some(decided_by),
                match decision {
                    Decision::Approve => "approval_granted",
                    Decision::Reject => "approval_rejected",
                },
                "approval_request",
                Some(approval.id.0),
                AuditStatus::Success,
                None,
            ))
            .await;

        if decision == Decision::Reject {
            self.return_incident_to_in_progress(tenant_id, &approval).await?;
            self.notifications
                .notify_user(
                    tenant_id,
                    approval.requested_by,
                    "approval_rejected",
                    &format!("Runbook execution for incident {} was rejected", approval.incident_id),
                )
                .await?;
        }

        Ok(approval)
    }

    async fn return_incident_to_in_progress(
        &self,
        tenant_id: TenantId,
        approval: &ApprovalRequest,
    ) -> Result<()> {
        if let Some(incident) = self.incidents.get_by_id(tenant_id, approval.incident_id).await? {
            if incident.status == IncidentStatus::PendingApproval {
                self.incidents
                    .update(
                        tenant_id,
                        incident.id,
                        incident.version,
                        serde_json::json!({
                            "status": IncidentStatus::InProgress,
                            "resolution": Resolution::Unresolved,
                        }),
                    )
                    .await?;
            }
        }
        Ok(())
    }
}
