use crate::common::TestContext;
use sentry_core::{AlertSeverity, IncidentId, IncidentStatus, Resolution, TenantId};
use sentry_incidents::Incident;
use std::collections::HashSet;

fn incident(
    tenant_id: TenantId,
    created_at: i64,
    resolved_at: Option<i64>,
    status: IncidentStatus,
    resolution: Resolution,
) -> Incident {
    Incident {
        id: IncidentId::new(),
        tenant_id,
        signature: "disk_full".to_string(),
        asset_name: "db-01".to_string(),
        alert_ids: HashSet::new(),
        alert_count: 1,
        priority_score: 0,
        severity: AlertSeverity::High,
        tool_sources: HashSet::new(),
        status,
        assigned_to: None,
        assigned_at: None,
        created_at,
        resolved_at,
        resolution,
        runbook_execution: None,
        sla_deadline: None,
        escalated_to: None,
        escalation_level: 0,
        version: 0,
    }
}

#[tokio::test]
async fn computes_noise_reduction_self_healed_and_mttr() {
    let ctx = TestContext::new();
    let tenant_id = TenantId::new();

    for i in 0..10 {
        ctx.seed_alert(
            tenant_id,
            "db-01",
            "disk_full",
            AlertSeverity::High,
            "datadog",
            1000 + i,
        )
        .await;
    }

    ctx.incidents
        .insert(&incident(
            tenant_id,
            1000,
            Some(1100),
            IncidentStatus::Resolved,
            Resolution::Auto,
        ))
        .await
        .unwrap();
    ctx.incidents
        .insert(&incident(
            tenant_id,
            1000,
            Some(1300),
            IncidentStatus::Resolved,
            Resolution::Manual,
        ))
        .await
        .unwrap();

    let snapshot = ctx
        .metrics
        .snapshot(tenant_id, 900, 2000, None)
        .await
        .unwrap();

    assert_eq!(snapshot.alert_count, 10);
    assert_eq!(snapshot.incident_count, 2);
    assert_eq!(snapshot.resolved_count, 2);
    // (1 - 2/10) * 100 = 80
    assert_eq!(snapshot.noise_reduction_pct, 80.0);
    // 1 of 2 resolved incidents is auto => 50%
    assert_eq!(snapshot.self_healed_pct, 50.0);
    assert_eq!(snapshot.mttr_auto_seconds, Some(100.0));
    assert_eq!(snapshot.mttr_manual_seconds, Some(300.0));
    assert!(snapshot.patch_compliance_pct.is_none());
}

#[tokio::test]
async fn empty_window_does_not_divide_by_zero() {
    let ctx = TestContext::new();
    let tenant_id = TenantId::new();

    let snapshot = ctx.metrics.snapshot(tenant_id, 0, 100, Some(97.5)).await.unwrap();

    assert_eq!(snapshot.alert_count, 0);
    assert_eq!(snapshot.incident_count, 0);
    // zero alerts and zero incidents: (1 - 0/max(1,0)) * 100 = 100
    assert_eq!(snapshot.noise_reduction_pct, 100.0);
    assert_eq!(snapshot.self_healed_pct, 0.0);
    assert_eq!(snapshot.mttr_manual_seconds, None);
    assert_eq!(snapshot.patch_compliance_pct, Some(97.5));
}
