//! Correlation engine (§4.F): groups uncorrelated alerts into incidents and
//! recomputes priority on every group update. Runs both on a periodic tick
//! and opportunistically right after ingestion; both call paths share this
//! one entry point so the behavior is identical either way.

use crate::models::Incident;
use crate::repository::IncidentRepository;
use sentry_core::{
    AlertSeverity, AuditLogger, CorrelationConfig, EventBus, IncidentId, IncidentStatus,
    Resolution, Result, TenantId, Topic,
};
use sentry_ingest::{Alert, AlertRepository};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

pub struct Correlator {
    incidents: IncidentRepository,
    alerts: AlertRepository,
    event_bus: Arc<EventBus>,
    audit: Arc<AuditLogger>,
}

/// Outcome of one correlation pass, for callers that want to log or test on
/// it; the engine itself never returns an error to the ingestion path (§4.F
/// failure semantics — correlator errors are logged to audit, never block
/// ingestion).
#[derive(Debug, Default)]
pub struct CorrelationOutcome {
    pub incidents_created: Vec<IncidentId>,
    pub incidents_updated: Vec<IncidentId>,
}

impl Correlator {
    pub fn new(
        incidents: IncidentRepository,
        alerts: AlertRepository,
        event_bus: Arc<EventBus>,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            incidents,
            alerts,
            event_bus,
            audit,
        }
    }

    /// Runs one pass for a tenant. `now` is the caller-supplied clock so the
    /// window math and age decay stay deterministic under test.
    pub async fn run(
        &self,
        tenant_id: TenantId,
        config: &CorrelationConfig,
        critical_assets: &HashSet<String>,
        now: i64,
    ) -> Result<CorrelationOutcome> {
        let since = now - config.time_window_seconds;
        let candidates = self.alerts.find_uncorrelated_since(tenant_id, since).await?;

        let mut groups: HashMap<String, Vec<Alert>> = HashMap::new();
        for alert in candidates {
            let key = config
                .aggregation_key
                .compute(&alert.asset_name, &alert.signature, &alert.tool_source);
            groups.entry(key).or_default().push(alert);
        }

        let mut outcome = CorrelationOutcome::default();
        for (_, group) in groups {
            if group.len() < 2 {
                let alert = &group[0];
                if alert.severity == AlertSeverity::Critical {
                    let incident = self
                        .create_incident(tenant_id, group, critical_assets, now)
                        .await?;
                    outcome.incidents_created.push(incident);
                }
                continue;
            }

            match self
                .incidents
                .find_open_by_key(
                    tenant_id,
                    config.aggregation_key,
                    since,
                    &group[0].asset_name,
                    &group[0].signature,
                    &group[0].tool_source,
                )
                .await?
            {
                Some(existing) => {
                    let id = self
                        .extend_incident(tenant_id, existing, group, critical_assets, now)
                        .await?;
                    outcome.incidents_updated.push(id);
                }
                None => {
                    let id = self
                        .create_incident(tenant_id, group, critical_assets, now)
                        .await?;
                    outcome.incidents_created.push(id);
                }
            }
        }

        Ok(outcome)
    }

    async fn create_incident(
        &self,
        tenant_id: TenantId,
        group: Vec<Alert>,
        critical_assets: &HashSet<String>,
        now: i64,
    ) -> Result<IncidentId> {
        let first = &group[0];
        let alert_ids = group.iter().map(|a| a.id).collect();
        let tool_sources = group.iter().map(|a| a.tool_source.clone()).collect();
        let severity = group
            .iter()
            .map(|a| a.severity)
            .max()
            .unwrap_or(AlertSeverity::Medium);

        let mut incident = Incident {
            id: IncidentId::new(),
            tenant_id,
            signature: first.signature.clone(),
            asset_name: first.asset_name.clone(),
            alert_ids,
            alert_count: group.len() as u32,
            priority_score: 0,
            severity,
            tool_sources,
            status: IncidentStatus::New,
            assigned_to: None,
            assigned_at: None,
            created_at: now,
            resolved_at: None,
            resolution: Resolution::Unresolved,
            runbook_execution: None,
            sla_deadline: None,
            escalated_to: None,
            escalation_level: 0,
            version: 0,
        };
        let critical = critical_assets.contains(&incident.asset_name);
        incident.priority_score = priority_score(&incident, critical, now);

        self.incidents.insert(&incident).await?;
        for alert in &group {
            self.alerts
                .mark_correlated(tenant_id, alert.id, incident.id)
                .await?;
        }

        let entry = AuditLogger::entry(
            tenant_id,
            None,
            "incident_created",
            "incident",
            Some(incident.id.0),
            sentry_core::AuditStatus::Success,
            None,
        );
        self.audit.log(entry).await;
        self.event_bus.publish(
            Topic::IncidentCreated,
            tenant_id,
            serde_json::to_value(&incident)?,
        );

        Ok(incident.id)
    }

    async fn extend_incident(
        &self,
        tenant_id: TenantId,
        mut incident: Incident,
        group: Vec<Alert>,
        critical_assets: &HashSet<String>,
        now: i64,
    ) -> Result<IncidentId> {
        let critical_asset = critical_assets.contains(&incident.asset_name);
        for alert in &group {
            incident.alert_ids.insert(alert.id);
            incident.tool_sources.insert(alert.tool_source.clone());
            if alert.severity > incident.severity {
                incident.severity = alert.severity;
            }
        }
        incident.alert_count = incident.alert_ids.len() as u32;
        incident.priority_score = priority_score(&incident, critical_asset, now);

        let patch = serde_json::json!({
            "alert_ids": incident.alert_ids,
            "alert_count": incident.alert_count,
            "tool_sources": incident.tool_sources,
            "severity": incident.severity,
            "priority_score": incident.priority_score,
        });
        self.incidents
            .update(tenant_id, incident.id, incident.version, patch)
            .await?;

        for alert in &group {
            self.alerts
                .mark_correlated(tenant_id, alert.id, incident.id)
                .await?;
        }

        self.event_bus.publish(
            Topic::IncidentUpdated,
            tenant_id,
            serde_json::to_value(&incident)?,
        );

        Ok(incident.id)
    }
}

/// §4.F priority formula, bounded to `[0, 150]`. `critical_asset` is looked
/// up by the caller against the tenant's `critical_assets` set, since the
/// incident itself doesn't carry that flag.
pub fn priority_score(incident: &Incident, critical_asset: bool, now: i64) -> i32 {
    let mut score = incident.severity.base_score();
    if critical_asset {
        score += 20;
    }
    score += (2 * (incident.alert_count.saturating_sub(1) as i32)).min(20);
    if incident.tool_sources.len() >= 2 {
        score += 10;
    }
    let hours_since_created = ((now - incident.created_at).max(0) / 3600) as i32;
    score -= hours_since_created.min(10);
    score.clamp(0, 150)
}

/// Orders two incidents competing for the same resource per §4.F's
/// tie-break rule: higher `alert_count`, then earliest `created_at`, then
/// lexicographic `id`.
pub fn tie_break(a: &Incident, b: &Incident) -> std::cmp::Ordering {
    b.alert_count
        .cmp(&a.alert_count)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.0.to_string().cmp(&b.id.0.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentry_core::{IncidentId, Resolution, TenantId};
    use std::collections::HashSet;

    fn base_incident(alert_count: u32, created_at: i64) -> Incident {
        Incident {
            id: IncidentId::new(),
            tenant_id: TenantId::new(),
            signature: "disk_full".to_string(),
            asset_name: "db-01".to_string(),
            alert_ids: HashSet::new(),
            alert_count,
            priority_score: 0,
            severity: AlertSeverity::High,
            tool_sources: HashSet::from(["datadog".to_string()]),
            status: IncidentStatus::New,
            assigned_to: None,
            assigned_at: None,
            created_at,
            resolved_at: None,
            resolution: Resolution::Unresolved,
            runbook_execution: None,
            sla_deadline: None,
            escalated_to: None,
            escalation_level: 0,
            version: 0,
        }
    }

    #[test]
    fn priority_clamps_at_upper_bound() {
        let mut incident = base_incident(20, 0);
        incident.severity = AlertSeverity::Critical;
        incident.tool_sources = HashSet::from(["datadog".to_string(), "zabbix".to_string()]);
        assert_eq!(priority_score(&incident, true, 0), 150);
    }

    #[test]
    fn priority_decays_with_age_but_not_below_zero() {
        let incident = base_incident(1, 0);
        let eleven_hours = 11 * 3600;
        // base(60) - age(min(11,10)=10) = 50
        assert_eq!(priority_score(&incident, false, eleven_hours), 50);
    }

    #[test]
    fn tie_break_prefers_higher_alert_count_then_earlier_created_at() {
        let a = base_incident(5, 100);
        let b = base_incident(3, 50);
        assert_eq!(tie_break(&a, &b), std::cmp::Ordering::Less);

        let c = base_incident(5, 100);
        let d = base_incident(5, 50);
        assert_eq!(tie_break(&c, &d), std::cmp::Ordering::Greater);
    }
}
