use crate::common::TestContext;
use sentry_core::{
    AlertSeverity, IncidentId, IncidentStatus, Resolution, SlaConfig, TenantId,
};
use sentry_incidents::Incident;
use std::collections::HashSet;

fn sla() -> SlaConfig {
    SlaConfig {
        critical_minutes: 30,
        high_minutes: 120,
        medium_minutes: 480,
        low_minutes: 1440,
    }
}

fn new_incident(tenant_id: TenantId, signature: &str) -> Incident {
    Incident {
        id: IncidentId::new(),
        tenant_id,
        signature: signature.to_string(),
        asset_name: "db-01".to_string(),
        alert_ids: HashSet::new(),
        alert_count: 2,
        priority_score: 60,
        severity: AlertSeverity::High,
        tool_sources: HashSet::from(["datadog".to_string()]),
        status: IncidentStatus::New,
        assigned_to: None,
        assigned_at: None,
        created_at: 1000,
        resolved_at: None,
        resolution: Resolution::Unresolved,
        runbook_execution: None,
        sla_deadline: None,
        escalated_to: None,
        escalation_level: 0,
        version: 0,
    }
}

#[tokio::test]
async fn highest_scorer_wins_and_incident_moves_to_in_progress() {
    let ctx = TestContext::new();
    let tenant_id = TenantId::new();
    let weak = ctx.seed_technician(tenant_id, &[], false, None).await;
    let strong = ctx
        .seed_technician(tenant_id, &["disk_full"], true, Some(15.0))
        .await;

    let incident = new_incident(tenant_id, "disk_full");
    ctx.incidents.insert(&incident).await.unwrap();

    let assigned = ctx
        .assigner
        .assign(tenant_id, incident.clone(), &sla(), 1000)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(assigned.assigned_to, Some(strong));
    assert_ne!(assigned.assigned_to, Some(weak));
    assert_eq!(assigned.status, IncidentStatus::InProgress);
    assert_eq!(assigned.assigned_at, Some(1000));
    // high severity => 120 minute SLA
    assert_eq!(assigned.sla_deadline, Some(1000 + 120 * 60));
}

#[tokio::test]
async fn ties_break_on_lowest_active_count_then_earliest_login() {
    let ctx = TestContext::new();
    let tenant_id = TenantId::new();
    // Neither technician has matching expertise, is on shift, or a fast
    // average: both score 50 on the load term alone (0 active incidents).
    let a = ctx.seed_technician(tenant_id, &[], false, None).await;
    let b = ctx.seed_technician(tenant_id, &[], false, None).await;

    let ranked = ctx.assigner.rank(tenant_id, "unmatched_signature").await.unwrap();
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].score, ranked[1].score);
    let winners: Vec<_> = ranked.iter().map(|c| c.user_id).collect();
    assert!(winners.contains(&a) && winners.contains(&b));
}

#[tokio::test]
async fn prior_handled_signature_outranks_partial_category_match() {
    let ctx = TestContext::new();
    let tenant_id = TenantId::new();
    let partial = ctx.seed_technician(tenant_id, &["disk-latency"], true, Some(15.0)).await;
    let exact = ctx.seed_technician(tenant_id, &[], true, Some(15.0)).await;
    ctx.signature_stats
        .record_handled(tenant_id, exact, "disk-full", 900)
        .await
        .unwrap();

    let ranked = ctx.assigner.rank(tenant_id, "disk-full").await.unwrap();
    assert_eq!(ranked[0].user_id, exact);
    assert_ne!(ranked[0].user_id, partial);
}

#[tokio::test]
async fn no_eligible_technician_returns_none() {
    let ctx = TestContext::new();
    let tenant_id = TenantId::new();
    let incident = new_incident(tenant_id, "disk_full");
    ctx.incidents.insert(&incident).await.unwrap();

    let assigned = ctx.assigner.assign(tenant_id, incident, &sla(), 1000).await.unwrap();
    assert!(assigned.is_none());
}
