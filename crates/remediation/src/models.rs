use sentry_core::{
    ApprovalRequestId, ApprovalStatus, IncidentId, NotificationId, RemediationExecutionId,
    RemediationStatus, RiskLevel, RunbookId, TenantId, UserId,
};
use serde::{Deserialize, Serialize};

/// §3 `Runbook`. `signature == "generic"` matches any incident signature
/// (§4.H step 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Runbook {
    pub id: RunbookId,
    pub tenant_id: TenantId,
    pub name: String,
    pub signature: String,
    pub risk: RiskLevel,
    pub auto_approve: bool,
    pub actions: Vec<String>,
    /// §4.H step 7: commands run against the same targets after a
    /// successful action; resolution only proceeds if every one of these
    /// also terminates in `Success`. Empty means the action's own result
    /// is the whole verdict.
    #[serde(default)]
    pub health_checks: Vec<String>,
    pub created_at: i64,
    pub version: u32,
}

impl Runbook {
    pub fn matches_incident_signature(&self, incident_signature: &str) -> bool {
        self.signature == "generic" || self.signature == incident_signature
    }
}

/// §3 `ApprovalRequest` / §4.I state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRequest {
    pub id: ApprovalRequestId,
    pub tenant_id: TenantId,
    pub incident_id: IncidentId,
    pub runbook_id: RunbookId,
    pub requested_by: UserId,
    pub risk: RiskLevel,
    pub status: ApprovalStatus,
    /// The target hosts from the original `dispatch` call, carried so an
    /// `approved` decision can resume execution against the same instances
    /// instead of an empty list (§4.H steps 4-5).
    #[serde(default)]
    pub target_hosts: Vec<String>,
    pub notes: Option<String>,
    pub decided_by: Option<UserId>,
    pub created_at: i64,
    /// Spec's `expires_at` (§3 `ApprovalRequest`): the approval-workflow
    /// deadline whose expiry is a lazy read-time state transition
    /// (pending→expired, §4.I), not a hide-the-record TTL. Stored under a
    /// different JSON key than `expires_at` so it doesn't collide with the
    /// storage facade's document-wide `is_expired` convention, which is
    /// reserved for entities meant to vanish outright (refresh tokens,
    /// short-term advisor memory) — an approval past its deadline must
    /// stay readable so it can be transitioned, not disappear.
    #[serde(rename = "decision_deadline")]
    pub expires_at: i64,
    pub decided_at: Option<i64>,
    pub version: u32,
}

impl ApprovalRequest {
    pub fn is_expired(&self, now: i64) -> bool {
        self.status == ApprovalStatus::Pending && now > self.expires_at
    }
}

/// §3 `RemediationExecution`, appended once per dispatch (§4.H step 8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationExecution {
    pub id: RemediationExecutionId,
    pub tenant_id: TenantId,
    pub incident_id: IncidentId,
    pub runbook_id: RunbookId,
    pub command_id: String,
    /// Target hosts the executor was invoked against (§3 `instance_ids`).
    #[serde(default)]
    pub instance_ids: Vec<String>,
    pub status: RemediationStatus,
    /// §3: stdout/stderr truncated to 64 KiB each, kept separate rather
    /// than concatenated so neither stream can crowd out the other.
    pub stdout_truncated: String,
    pub stderr_truncated: String,
    pub started_at: i64,
    pub finished_at: Option<i64>,
    pub duration_seconds: Option<i64>,
    pub version: u32,
}

/// §3 `Notification`, 48h TTL. `notification_type` avoids colliding with
/// the `type` keyword; serialized as `type` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub tenant_id: TenantId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub message: String,
    pub read: bool,
    pub created_at: i64,
    pub expires_at: i64,
}

pub const NOTIFICATION_TTL_SECONDS: i64 = 48 * 3600;
