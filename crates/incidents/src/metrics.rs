//! Metrics aggregator (§4.M): on-demand KPI snapshots over a caller-supplied
//! window. Pure computation over storage reads; no caching beyond whatever
//! the storage layer itself does.

use crate::repository::IncidentRepository;
use sentry_core::{IncidentStatus, Resolution, Result, TenantId};
use sentry_ingest::AlertRepository;
use serde::Serialize;

pub struct MetricsAggregator {
    incidents: IncidentRepository,
    alerts: AlertRepository,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub window_start: i64,
    pub window_end: i64,
    pub alert_count: usize,
    pub incident_count: usize,
    pub resolved_count: usize,
    pub noise_reduction_pct: f64,
    pub self_healed_pct: f64,
    pub mttr_manual_seconds: Option<f64>,
    pub mttr_auto_seconds: Option<f64>,
    /// Pulled from the executor interface if one is configured; `None`
    /// means the platform has no patch-compliance source wired up.
    pub patch_compliance_pct: Option<f64>,
}

impl MetricsAggregator {
    pub fn new(incidents: IncidentRepository, alerts: AlertRepository) -> Self {
        Self { incidents, alerts }
    }

    pub async fn snapshot(
        &self,
        tenant_id: TenantId,
        window_start: i64,
        window_end: i64,
        patch_compliance_pct: Option<f64>,
    ) -> Result<MetricsSnapshot> {
        let alert_count = self
            .alerts
            .count_between(tenant_id, window_start, window_end)
            .await?;

        let incidents = self
            .incidents
            .find_created_between(tenant_id, window_start, window_end)
            .await?;
        let incident_count = incidents.len();

        let resolved: Vec<_> = incidents
            .iter()
            .filter(|i| i.status == IncidentStatus::Resolved)
            .collect();
        let resolved_count = resolved.len();

        let noise_reduction_pct = (1.0 - incident_count as f64 / (alert_count.max(1) as f64)) * 100.0;

        let auto_resolved = resolved
            .iter()
            .filter(|i| i.resolution == Resolution::Auto)
            .count();
        let self_healed_pct = auto_resolved as f64 / (resolved_count.max(1) as f64) * 100.0;

        let mttr_manual_seconds = mean_resolution_seconds(&resolved, Resolution::Manual);
        let mttr_auto_seconds = mean_resolution_seconds(&resolved, Resolution::Auto);

        Ok(MetricsSnapshot {
            window_start,
            window_end,
            alert_count,
            incident_count,
            resolved_count,
            noise_reduction_pct,
            self_healed_pct,
            mttr_manual_seconds,
            mttr_auto_seconds,
            patch_compliance_pct,
        })
    }
}

fn mean_resolution_seconds(
    resolved: &[&crate::models::Incident],
    resolution: Resolution,
) -> Option<f64> {
    let durations: Vec<f64> = resolved
        .iter()
        .filter(|i| i.resolution == resolution)
        .filter_map(|i| i.resolved_at.map(|r| (r - i.created_at) as f64))
        .collect();
    if durations.is_empty() {
        return None;
    }
    Some(durations.iter().sum::<f64>() / durations.len() as f64)
}
