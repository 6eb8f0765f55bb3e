//! Assignment/scoring (§4.G): ranks the tenant's technicians for an
//! incident and hands it to the winner.

use crate::models::Incident;
use crate::repository::{IncidentRepository, SignatureStatsRepository};
use sentry_auth::{AuthRepository, User};
use sentry_core::{AuditLogger, EventBus, Result, Role, SlaConfig, TenantId, Topic, UserId};
use std::sync::Arc;

pub struct Assigner {
    incidents: IncidentRepository,
    users: AuthRepository,
    signature_stats: SignatureStatsRepository,
    event_bus: Arc<EventBus>,
    audit: Arc<AuditLogger>,
}

/// One technician's score, kept around for tie-break inspection in tests.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    pub user_id: UserId,
    pub score: i32,
    pub active_incident_count: usize,
    pub last_login_at: Option<i64>,
}

impl Assigner {
    pub fn new(
        incidents: IncidentRepository,
        users: AuthRepository,
        signature_stats: SignatureStatsRepository,
        event_bus: Arc<EventBus>,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            incidents,
            users,
            signature_stats,
            event_bus,
            audit,
        }
    }

    /// Scores every technician in the tenant against `incident.signature`
    /// and returns them ranked best-first per §4.G's tie-break rule: lowest
    /// active count, then earliest login.
    pub async fn rank(&self, tenant_id: TenantId, signature: &str) -> Result<Vec<Candidate>> {
        let technicians = self.users.list_by_role(tenant_id, Role::Technician).await?;
        let mut candidates = Vec::with_capacity(technicians.len());
        for user in &technicians {
            let active_incident_count = self.incidents.count_open_assigned(tenant_id, user.id).await?;
            let expertise_match = self.expertise_match(tenant_id, user, signature).await?;
            candidates.push(Candidate {
                user_id: user.id,
                score: score(expertise_match, active_incident_count, user),
                active_incident_count,
                last_login_at: user.last_login_at,
            });
        }
        candidates.sort_by(|a, b| {
            b.score
                .cmp(&a.score)
                .then_with(|| a.active_incident_count.cmp(&b.active_incident_count))
                .then_with(|| a.last_login_at.cmp(&b.last_login_at))
        });
        Ok(candidates)
    }

    /// §4.G `expertise_match(signature)`: 1.0 if the `technician_signature_stats`
    /// side index shows this technician has personally resolved this exact
    /// signature before, else 0.3 for a partial category match against their
    /// `expertise` tags, else 0.0. Category is the signature's prefix up to
    /// its first `-`/`_` (e.g. `disk-full` and `disk-latency` share `disk`).
    async fn expertise_match(&self, tenant_id: TenantId, user: &User, signature: &str) -> Result<f64> {
        if self.signature_stats.has_handled(tenant_id, user.id, signature).await? {
            return Ok(1.0);
        }
        let category = signature_category(signature);
        if user.expertise.iter().any(|tag| signature_category(tag) == category) {
            return Ok(0.3);
        }
        Ok(0.0)
    }

    /// Assigns an incident to its highest-ranked technician, moves it to
    /// `in_progress`, starts the SLA clock, and emits `incident.assigned`.
    /// Returns `None` if the tenant has no eligible technician.
    pub async fn assign(
        &self,
        tenant_id: TenantId,
        mut incident: Incident,
        sla: &SlaConfig,
        now: i64,
    ) -> Result<Option<Incident>> {
        let ranked = self.rank(tenant_id, &incident.signature).await?;
        let Some(winner) = ranked.first() else {
            return Ok(None);
        };

        let deadline = now + sla.deadline_minutes(incident.severity) * 60;
        let patch = serde_json::json!({
            "assigned_to": winner.user_id,
            "assigned_at": now,
            "status": sentry_core::IncidentStatus::InProgress,
            "sla_deadline": deadline,
        });
        let applied = self
            .incidents
            .update(tenant_id, incident.id, incident.version, patch)
            .await?;
        if !applied {
            return Err(sentry_core::Error::conflict(
                "incident was modified concurrently during assignment",
            ));
        }

        incident.assigned_to = Some(winner.user_id);
        incident.assigned_at = Some(now);
        incident.status = sentry_core::IncidentStatus::InProgress;
        incident.sla_deadline = Some(deadline);
        incident.version += 1;

        let entry = AuditLogger::entry(
            tenant_id,
            Some(winner.user_id),
            "incident_assigned",
            "incident",
            Some(incident.id.0),
            sentry_core::AuditStatus::Success,
            None,
        );
        self.audit.log(entry).await;
        self.event_bus.publish(
            Topic::IncidentAssigned,
            tenant_id,
            serde_json::to_value(&incident)?,
        );

        Ok(Some(incident))
    }
}

/// `50·expertise_match(signature) + max(0, 50 − 10·active_incident_count) +
/// 30·on_shift + 20·(avg_resolution_min < 30)`.
fn score(expertise_match: f64, active_incident_count: usize, user: &User) -> i32 {
    let load_term = (50 - 10 * active_incident_count as i32).max(0);
    let shift_term = if user.on_shift { 30 } else { 0 };
    let speed_term = match user.avg_resolution_min {
        Some(minutes) if minutes < 30.0 => 20,
        _ => 0,
    };
    (50.0 * expertise_match).round() as i32 + load_term + shift_term + speed_term
}

fn signature_category(signature: &str) -> &str {
    signature.split(['-', '_']).next().unwrap_or(signature)
}
