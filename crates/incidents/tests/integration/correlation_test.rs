use crate::common::TestContext;
use sentry_core::{AggregationKeyKind, AlertSeverity, CorrelationConfig, IncidentStatus, TenantId};
use std::collections::HashSet;

fn config() -> CorrelationConfig {
    CorrelationConfig {
        time_window_seconds: 300,
        aggregation_key: AggregationKeyKind::AssetSignature,
        auto_correlate: true,
    }
}

#[tokio::test]
async fn two_matching_alerts_create_one_incident() {
    let ctx = TestContext::new();
    let tenant_id = TenantId::new();
    ctx.seed_alert(tenant_id, "db-01", "disk_full", AlertSeverity::High, "datadog", 1000)
        .await;
    ctx.seed_alert(tenant_id, "db-01", "disk_full", AlertSeverity::High, "datadog", 1010)
        .await;

    let outcome = ctx
        .correlator
        .run(tenant_id, &config(), &HashSet::new(), 1020)
        .await
        .unwrap();

    assert_eq!(outcome.incidents_created.len(), 1);
    let incident = ctx
        .incidents
        .get_by_id(tenant_id, outcome.incidents_created[0])
        .await
        .unwrap()
        .unwrap();
    assert_eq!(incident.alert_count, 2);
    assert_eq!(incident.status, IncidentStatus::New);
}

#[tokio::test]
async fn single_non_critical_alert_is_not_promoted() {
    let ctx = TestContext::new();
    let tenant_id = TenantId::new();
    ctx.seed_alert(tenant_id, "web-02", "high_cpu", AlertSeverity::High, "datadog", 1000)
        .await;

    let outcome = ctx
        .correlator
        .run(tenant_id, &config(), &HashSet::new(), 1020)
        .await
        .unwrap();

    assert!(outcome.incidents_created.is_empty());
}

#[tokio::test]
async fn single_critical_alert_is_promoted_immediately() {
    let ctx = TestContext::new();
    let tenant_id = TenantId::new();
    ctx.seed_alert(
        tenant_id,
        "web-02",
        "service_down",
        AlertSeverity::Critical,
        "pagerduty",
        1000,
    )
    .await;

    let outcome = ctx
        .correlator
        .run(tenant_id, &config(), &HashSet::new(), 1020)
        .await
        .unwrap();

    assert_eq!(outcome.incidents_created.len(), 1);
}

#[tokio::test]
async fn a_later_matching_alert_extends_the_existing_incident() {
    let ctx = TestContext::new();
    let tenant_id = TenantId::new();
    ctx.seed_alert(tenant_id, "db-01", "disk_full", AlertSeverity::High, "datadog", 1000)
        .await;
    ctx.seed_alert(tenant_id, "db-01", "disk_full", AlertSeverity::High, "datadog", 1010)
        .await;
    let first_pass = ctx
        .correlator
        .run(tenant_id, &config(), &HashSet::new(), 1020)
        .await
        .unwrap();
    let incident_id = first_pass.incidents_created[0];

    ctx.seed_alert(tenant_id, "db-01", "disk_full", AlertSeverity::High, "datadog", 1030)
        .await;
    let second_pass = ctx
        .correlator
        .run(tenant_id, &config(), &HashSet::new(), 1040)
        .await
        .unwrap();

    assert_eq!(second_pass.incidents_updated, vec![incident_id]);
    let incident = ctx.incidents.get_by_id(tenant_id, incident_id).await.unwrap().unwrap();
    assert_eq!(incident.alert_count, 3);
}

#[tokio::test]
async fn priority_score_reflects_critical_asset_bonus_and_multi_tool() {
    let ctx = TestContext::new();
    let tenant_id = TenantId::new();
    ctx.seed_alert(tenant_id, "db-01", "disk_full", AlertSeverity::High, "datadog", 1000)
        .await;
    ctx.seed_alert(tenant_id, "db-01", "disk_full", AlertSeverity::High, "zabbix", 1010)
        .await;

    let mut critical_assets = HashSet::new();
    critical_assets.insert("db-01".to_string());

    let outcome = ctx
        .correlator
        .run(tenant_id, &config(), &critical_assets, 1010)
        .await
        .unwrap();
    let incident = ctx
        .incidents
        .get_by_id(tenant_id, outcome.incidents_created[0])
        .await
        .unwrap()
        .unwrap();

    // base(60) + critical_asset(20) + duplicate(min(2*1,20)=2) + multi_tool(10) - age(0)
    assert_eq!(incident.priority_score, 92);
}
