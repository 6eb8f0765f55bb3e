use sentry_core::{AlertId, AlertSeverity, IncidentId, TenantId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Auto-discovered on first alert referencing an unknown name (§3 `Asset`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: uuid::Uuid,
    pub tenant_id: TenantId,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub is_critical: bool,
    pub tags: HashSet<String>,
    pub created_at: i64,
    pub version: u32,
}

/// Immutable after insert except `correlated`/`incident_id` (§3 `Alert`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub tenant_id: TenantId,
    pub asset_name: String,
    pub signature: String,
    pub severity: AlertSeverity,
    pub message: String,
    pub tool_source: String,
    pub timestamp: i64,
    pub delivery_id: String,
    pub delivery_attempts: u32,
    pub correlated: bool,
    pub incident_id: Option<IncidentId>,
    pub metadata: Option<serde_json::Value>,
}
