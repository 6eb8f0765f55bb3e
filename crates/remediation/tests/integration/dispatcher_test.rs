use crate::common::TestContext;
use sentry_core::{AlertSeverity, ApprovalStatus, IncidentStatus, RemediationStatus, RiskLevel, Role};
use sentry_remediation::DispatchOutcome;

#[tokio::test]
async fn low_risk_auto_approve_runbook_executes_immediately() {
    let ctx = TestContext::new();
    let tenant_id = sentry_core::TenantId::new();
    let technician = ctx.seed_user(tenant_id, Role::Technician).await;
    let incident = ctx
        .seed_incident(tenant_id, "disk-full", AlertSeverity::Medium, 1_000, None, Some(technician))
        .await;
    let runbook = ctx.seed_runbook(tenant_id, "disk-full", RiskLevel::Low, true).await;
    let requester = ctx.users.get_user_by_id(technician).await.unwrap().unwrap();

    let outcome = ctx
        .dispatcher
        .dispatch(tenant_id, incident.id, runbook.id, &requester, &["i-0001".to_string()])
        .await
        .expect("low-risk dispatch should succeed");

    let execution_id = match outcome {
        DispatchOutcome::Executing { execution_id } => execution_id,
        DispatchOutcome::PendingApproval { .. } => panic!("low-risk auto-approve runbook should not gate on approval"),
    };
    assert_eq!(ctx.executor.submission_count(), 1);

    let updated = ctx.incidents.get_by_id(tenant_id, incident.id).await.unwrap().unwrap();
    assert_eq!(updated.status, IncidentStatus::Remediating);

    let command_id = "cmd-0".to_string();
    ctx.executor.seed_result(
        &command_id,
        sentry_remediation::ExecutorStatusReport {
            status: RemediationStatus::Success,
            stdout: "ok".to_string(),
            stderr: String::new(),
            finished_at: Some(1_100),
        },
    );
    let execution = sentry_remediation::RemediationExecution {
        id: execution_id,
        tenant_id,
        incident_id: incident.id,
        runbook_id: runbook.id,
        command_id,
        instance_ids: vec!["i-0001".to_string()],
        status: RemediationStatus::InProgress,
        stdout_truncated: String::new(),
        stderr_truncated: String::new(),
        started_at: 1_000,
        finished_at: None,
        duration_seconds: None,
        version: 0,
    };
    let result = ctx
        .dispatcher
        .poll_to_completion(tenant_id, incident.id, Some(technician), execution)
        .await
        .expect("poll should resolve to a terminal status");
    assert_eq!(result, RemediationStatus::Success);

    let resolved = ctx.incidents.get_by_id(tenant_id, incident.id).await.unwrap().unwrap();
    assert_eq!(resolved.status, IncidentStatus::Resolved);
    assert_eq!(resolved.resolution, sentry_core::Resolution::Auto);
}

#[tokio::test]
async fn failing_health_check_keeps_incident_unresolved_despite_successful_action() {
    let ctx = TestContext::new();
    let tenant_id = sentry_core::TenantId::new();
    let technician = ctx.seed_user(tenant_id, Role::Technician).await;
    let incident = ctx
        .seed_incident(tenant_id, "disk-full", AlertSeverity::Medium, 1_000, None, Some(technician))
        .await;
    let runbook = ctx
        .seed_runbook_with_health_checks(
            tenant_id,
            "disk-full",
            RiskLevel::Low,
            true,
            vec!["check-disk-usage".to_string()],
        )
        .await;
    let requester = ctx.users.get_user_by_id(technician).await.unwrap().unwrap();

    let outcome = ctx
        .dispatcher
        .dispatch(tenant_id, incident.id, runbook.id, &requester, &["i-0050".to_string()])
        .await
        .expect("low-risk dispatch should succeed");
    let execution_id = match outcome {
        DispatchOutcome::Executing { execution_id } => execution_id,
        DispatchOutcome::PendingApproval { .. } => panic!("low-risk auto-approve runbook should not gate"),
    };

    ctx.executor.seed_result(
        "cmd-0",
        sentry_remediation::ExecutorStatusReport {
            status: RemediationStatus::Success,
            stdout: "restarted".to_string(),
            stderr: String::new(),
            finished_at: Some(1_100),
        },
    );
    ctx.executor.seed_result(
        "cmd-1",
        sentry_remediation::ExecutorStatusReport {
            status: RemediationStatus::Failed,
            stdout: String::new(),
            stderr: "disk still above threshold".to_string(),
            finished_at: Some(1_110),
        },
    );

    let execution = sentry_remediation::RemediationExecution {
        id: execution_id,
        tenant_id,
        incident_id: incident.id,
        runbook_id: runbook.id,
        command_id: "cmd-0".to_string(),
        instance_ids: vec!["i-0050".to_string()],
        status: RemediationStatus::InProgress,
        stdout_truncated: String::new(),
        stderr_truncated: String::new(),
        started_at: 1_000,
        finished_at: None,
        duration_seconds: None,
        version: 0,
    };
    let result = ctx
        .dispatcher
        .poll_to_completion(tenant_id, incident.id, Some(technician), execution)
        .await
        .expect("poll should resolve to a terminal status");
    assert_eq!(result, RemediationStatus::Success);

    let updated = ctx.incidents.get_by_id(tenant_id, incident.id).await.unwrap().unwrap();
    assert_eq!(updated.status, IncidentStatus::InProgress);
    assert_eq!(updated.resolution, sentry_core::Resolution::Unresolved);
}

#[tokio::test]
async fn medium_risk_runbook_without_auto_approve_gates_on_approval() {
    let ctx = TestContext::new();
    let tenant_id = sentry_core::TenantId::new();
    let technician = ctx.seed_user(tenant_id, Role::Technician).await;
    let _approver = ctx.seed_user(tenant_id, Role::TenantAdmin).await;
    let incident = ctx
        .seed_incident(tenant_id, "mem-leak", AlertSeverity::High, 1_000, None, Some(technician))
        .await;
    let runbook = ctx.seed_runbook(tenant_id, "mem-leak", RiskLevel::Medium, false).await;
    let requester = ctx.users.get_user_by_id(technician).await.unwrap().unwrap();

    let outcome = ctx
        .dispatcher
        .dispatch(tenant_id, incident.id, runbook.id, &requester, &["i-0002".to_string()])
        .await
        .expect("dispatch should succeed and gate on approval");

    let approval_id = match outcome {
        DispatchOutcome::PendingApproval { approval_id } => approval_id,
        DispatchOutcome::Executing { .. } => panic!("medium-risk non-auto-approve runbook must gate on approval"),
    };
    assert_eq!(ctx.executor.submission_count(), 0, "dispatcher must not execute before approval");

    let gated = ctx.incidents.get_by_id(tenant_id, incident.id).await.unwrap().unwrap();
    assert_eq!(gated.status, IncidentStatus::PendingApproval);

    let pending = ctx.approvals.get_by_id(tenant_id, approval_id).await.unwrap().unwrap();
    assert_eq!(pending.status, ApprovalStatus::Pending);
}

#[tokio::test]
async fn requester_below_minimum_role_for_risk_level_is_rejected() {
    let ctx = TestContext::new();
    let tenant_id = sentry_core::TenantId::new();
    let technician = ctx.seed_user(tenant_id, Role::Technician).await;
    let incident = ctx
        .seed_incident(tenant_id, "breach-detected", AlertSeverity::Critical, 1_000, None, Some(technician))
        .await;
    let runbook = ctx.seed_runbook(tenant_id, "breach-detected", RiskLevel::High, false).await;
    let requester = ctx.users.get_user_by_id(technician).await.unwrap().unwrap();

    let result = ctx
        .dispatcher
        .dispatch(tenant_id, incident.id, runbook.id, &requester, &["i-0003".to_string()])
        .await;

    assert!(result.is_err(), "a technician must not be able to trigger a high-risk runbook");
}
