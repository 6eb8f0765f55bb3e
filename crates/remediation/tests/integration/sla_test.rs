use crate::common::TestContext;
use sentry_core::{AlertSeverity, Role};

#[tokio::test]
async fn a_breached_incident_escalates_one_rung_per_scan() {
    let ctx = TestContext::new();
    let tenant_id = sentry_core::TenantId::new();
    let technician = ctx.seed_user(tenant_id, Role::Technician).await;
    let _tenant_admin = ctx.seed_user(tenant_id, Role::TenantAdmin).await;
    let _msp_admin = ctx.seed_user(tenant_id, Role::MspAdmin).await;

    // SLA deadline already passed relative to `now`.
    let incident = ctx
        .seed_incident(tenant_id, "disk-full", AlertSeverity::High, 1_000, Some(1_500), Some(technician))
        .await;

    let escalated = ctx
        .sla_monitor
        .scan(tenant_id, 0, 2_000)
        .await
        .expect("scan should succeed");
    assert_eq!(escalated, 1);

    let updated = ctx.incidents.get_by_id(tenant_id, incident.id).await.unwrap().unwrap();
    assert_eq!(updated.status, sentry_core::IncidentStatus::Escalated);
    assert_eq!(updated.escalated_to, Some(Role::TenantAdmin));
    assert_eq!(updated.escalation_level, 1);
}

#[tokio::test]
async fn a_scan_never_escalates_the_same_incident_twice() {
    let ctx = TestContext::new();
    let tenant_id = sentry_core::TenantId::new();
    let technician = ctx.seed_user(tenant_id, Role::Technician).await;
    let _tenant_admin = ctx.seed_user(tenant_id, Role::TenantAdmin).await;
    let _msp_admin = ctx.seed_user(tenant_id, Role::MspAdmin).await;

    let incident = ctx
        .seed_incident(tenant_id, "disk-full", AlertSeverity::High, 1_000, Some(1_500), Some(technician))
        .await;

    let first = ctx.sla_monitor.scan(tenant_id, 0, 2_000).await.unwrap();
    assert_eq!(first, 1);

    let second = ctx.sla_monitor.scan(tenant_id, 0, 2_001).await.unwrap();
    assert_eq!(second, 1, "the incident is still breached and not yet at the top rung, so it escalates again");

    let updated = ctx.incidents.get_by_id(tenant_id, incident.id).await.unwrap().unwrap();
    assert_eq!(updated.escalated_to, Some(Role::MspAdmin));
    assert_eq!(updated.escalation_level, 2);

    let third = ctx.sla_monitor.scan(tenant_id, 0, 2_002).await.unwrap();
    assert_eq!(third, 0, "escalation_level 2 has exhausted the ladder");
}

#[tokio::test]
async fn an_incident_not_yet_breached_is_left_alone() {
    let ctx = TestContext::new();
    let tenant_id = sentry_core::TenantId::new();
    let technician = ctx.seed_user(tenant_id, Role::Technician).await;
    let incident = ctx
        .seed_incident(tenant_id, "disk-full", AlertSeverity::Low, 1_000, Some(5_000), Some(technician))
        .await;

    let escalated = ctx.sla_monitor.scan(tenant_id, 0, 2_000).await.unwrap();
    assert_eq!(escalated, 0);

    let unchanged = ctx.incidents.get_by_id(tenant_id, incident.id).await.unwrap().unwrap();
    assert_eq!(unchanged.escalation_level, 0);
}
