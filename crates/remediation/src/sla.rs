//! SLA/escalation monitor (§4.J). Runs on a five-minute tick (§5); each call
//! to `scan` advances every breached incident at most one rung of the
//! escalation ladder `technician -> tenant_admin -> msp_admin`.

use sentry_core::{AuditLogger, AuditStatus, IncidentStatus, Result, Role, TenantId};
use sentry_incidents::IncidentRepository;
use std::sync::Arc;

use crate::notifications::NotificationService;

pub struct SlaMonitor {
    incidents: IncidentRepository,
    notifications: NotificationService,
    audit: Arc<AuditLogger>,
}

/// The rung an incident escalates to *next*, keyed by its current
/// `escalation_level`. Level 0 (never escalated) steps up to
/// `tenant_admin`; level 1 steps up to `msp_admin`. An incident already at
/// level 2 has exhausted the ladder and is left alone.
fn next_rung(escalation_level: u32) -> Option<Role> {
    match escalation_level {
        0 => Some(Role::TenantAdmin),
        1 => Some(Role::MspAdmin),
        _ => None,
    }
}

impl SlaMonitor {
    pub fn new(incidents: IncidentRepository, notifications: NotificationService, audit: Arc<AuditLogger>) -> Self {
        Self {
            incidents,
            notifications,
            audit,
        }
    }

    /// Escalates every open, SLA-breached incident in the tenant by one
    /// rung and returns how many were advanced. Safe to call repeatedly;
    /// an incident already escalated this scan (or past `msp_admin`) is a
    /// no-op.
    pub async fn scan(&self, tenant_id: TenantId, since: i64, now: i64) -> Result<usize> {
        let candidates = self.incidents.find_open_since(tenant_id, since).await?;
        let mut escalated = 0usize;

        for incident in candidates {
            if !incident.is_breached(now) {
                continue;
            }
            let Some(rung) = next_rung(incident.escalation_level) else {
                continue;
            };

            let applied = self
                .incidents
                .update(
                    tenant_id,
                    incident.id,
                    incident.version,
                    serde_json::json!({
                        "status": IncidentStatus::Escalated,
                        "escalated_to": rung,
                        "escalation_level": incident.escalation_level + 1,
                    }),
                )
                .await?;
            if !applied {
                // Another scan (or a concurrent state change) already moved
                // this incident; pick it up next tick instead of retrying
                // mid-scan.
                continue;
            }

            self.notifications
                .notify_role(
                    tenant_id,
                    rung,
                    "incident_escalated",
                    &format!(
                        "Incident {} breached its SLA and escalated to {}",
                        incident.id, rung
                    ),
                )
                .await?;

            self.audit
                .log(AuditLogger::entry(
                    tenant_id,
                    None,
                    "incident_escalated",
                    "incident",
                    Some(incident.id.0),
                    AuditStatus::Success,
                    Some(serde_json::json!({ "escalated_to": rung })),
                ))
                .await;

            escalated += 1;
        }

        Ok(escalated)
    }
}
