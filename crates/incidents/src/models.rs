use sentry_core::{AlertId, AlertSeverity, IncidentId, IncidentStatus, Resolution, Role, TenantId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// §3 `Incident`. Invariant: every id in `alert_ids` shares this incident's
/// `tenant_id`, `signature` and `asset_name` (enforced by the correlation
/// engine, which is the only writer that ever appends to `alert_ids`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Incident {
    pub id: IncidentId,
    pub tenant_id: TenantId,
    pub signature: String,
    pub asset_name: String,
    pub alert_ids: HashSet<AlertId>,
    pub alert_count: u32,
    pub priority_score: i32,
    pub severity: AlertSeverity,
    pub tool_sources: HashSet<String>,
    pub status: IncidentStatus,
    pub assigned_to: Option<UserId>,
    pub assigned_at: Option<i64>,
    pub created_at: i64,
    pub resolved_at: Option<i64>,
    pub resolution: Resolution,
    pub runbook_execution: Option<uuid::Uuid>,
    pub sla_deadline: Option<i64>,
    pub escalated_to: Option<Role>,
    pub escalation_level: u32,
    pub version: u32,
}

impl Incident {
    pub fn is_breached(&self, now: i64) -> bool {
        self.status.is_open() && self.sla_deadline.is_some_and(|d| now > d)
    }
}

/// A side index of which signatures a technician has personally resolved
/// before, consulted by the assignment scorer's `expertise_match` term
/// (§4.G). One row per `(tenant_id, user_id, signature)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicianSignatureStat {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    pub signature: String,
    pub handled_count: u32,
    pub last_handled_at: i64,
}
