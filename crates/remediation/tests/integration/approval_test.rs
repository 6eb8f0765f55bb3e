use crate::common::TestContext;
use sentry_core::{AlertSeverity, ApprovalStatus, IncidentStatus, RiskLevel, Role};
use sentry_remediation::{Decision, DispatchOutcome};

#[tokio::test]
async fn approving_a_pending_request_flips_its_status() {
    let ctx = TestContext::new();
    let tenant_id = sentry_core::TenantId::new();
    let technician = ctx.seed_user(tenant_id, Role::Technician).await;
    let approver = ctx.seed_user(tenant_id, Role::TenantAdmin).await;
    let incident = ctx
        .seed_incident(tenant_id, "mem-leak", AlertSeverity::High, 1_000, None, Some(technician))
        .await;
    let runbook = ctx.seed_runbook(tenant_id, "mem-leak", RiskLevel::Medium, false).await;
    let requester = ctx.users.get_user_by_id(technician).await.unwrap().unwrap();

    let outcome = ctx
        .dispatcher
        .dispatch(tenant_id, incident.id, runbook.id, &requester, &["i-0001".to_string()])
        .await
        .unwrap();
    let approval_id = match outcome {
        DispatchOutcome::PendingApproval { approval_id } => approval_id,
        _ => panic!("expected approval gate"),
    };

    let decided = ctx
        .approval_workflow
        .decide(tenant_id, approval_id, Decision::Approve, approver, None, 1_050)
        .await
        .expect("approval decision should succeed");
    assert_eq!(decided.status, ApprovalStatus::Approved);
    assert_eq!(decided.decided_by, Some(approver));
}

#[tokio::test]
async fn approved_request_retains_the_original_dispatch_target_hosts() {
    let ctx = TestContext::new();
    let tenant_id = sentry_core::TenantId::new();
    let technician = ctx.seed_user(tenant_id, Role::Technician).await;
    let approver = ctx.seed_user(tenant_id, Role::TenantAdmin).await;
    let incident = ctx
        .seed_incident(tenant_id, "mem-leak", AlertSeverity::High, 1_000, None, Some(technician))
        .await;
    let runbook = ctx.seed_runbook(tenant_id, "mem-leak", RiskLevel::Medium, false).await;
    let requester = ctx.users.get_user_by_id(technician).await.unwrap().unwrap();

    let outcome = ctx
        .dispatcher
        .dispatch(tenant_id, incident.id, runbook.id, &requester, &["i-0099".to_string()])
        .await
        .unwrap();
    let approval_id = match outcome {
        DispatchOutcome::PendingApproval { approval_id } => approval_id,
        _ => panic!("expected approval gate"),
    };

    let decided = ctx
        .approval_workflow
        .decide(tenant_id, approval_id, Decision::Approve, approver, None, 1_050)
        .await
        .expect("approval decision should succeed");
    assert_eq!(decided.target_hosts, vec!["i-0099".to_string()]);
}

#[tokio::test]
async fn rejecting_a_pending_request_returns_incident_to_in_progress() {
    let ctx = TestContext::new();
    let tenant_id = sentry_core::TenantId::new();
    let technician = ctx.seed_user(tenant_id, Role::Technician).await;
    let approver = ctx.seed_user(tenant_id, Role::TenantAdmin).await;
    let incident = ctx
        .seed_incident(tenant_id, "mem-leak", AlertSeverity::High, 1_000, None, Some(technician))
        .await;
    let runbook = ctx.seed_runbook(tenant_id, "mem-leak", RiskLevel::Medium, false).await;
    let requester = ctx.users.get_user_by_id(technician).await.unwrap().unwrap();

    let outcome = ctx
        .dispatcher
        .dispatch(tenant_id, incident.id, runbook.id, &requester, &["i-0002".to_string()])
        .await
        .unwrap();
    let approval_id = match outcome {
        DispatchOutcome::PendingApproval { approval_id } => approval_id,
        _ => panic!("expected approval gate"),
    };

    ctx.approval_workflow
        .decide(tenant_id, approval_id, Decision::Reject, approver, Some("too risky right now".to_string()), 1_050)
        .await
        .expect("rejection should succeed");

    let updated = ctx.incidents.get_by_id(tenant_id, incident.id).await.unwrap().unwrap();
    assert_eq!(updated.status, IncidentStatus::InProgress);
}

#[tokio::test]
async fn a_read_past_the_deadline_lazily_expires_the_request() {
    let ctx = TestContext::new();
    let tenant_id = sentry_core::TenantId::new();
    let technician = ctx.seed_user(tenant_id, Role::Technician).await;
    let incident = ctx
        .seed_incident(tenant_id, "mem-leak", AlertSeverity::High, 1_000, None, Some(technician))
        .await;
    let runbook = ctx.seed_runbook(tenant_id, "mem-leak", RiskLevel::Medium, false).await;
    let requester = ctx.users.get_user_by_id(technician).await.unwrap().unwrap();

    let outcome = ctx
        .dispatcher
        .dispatch(tenant_id, incident.id, runbook.id, &requester, &["i-0003".to_string()])
        .await
        .unwrap();
    let approval_id = match outcome {
        DispatchOutcome::PendingApproval { approval_id } => approval_id,
        _ => panic!("expected approval gate"),
    };

    // Well past the one-hour decision deadline.
    let later = 1_000 + 3 * 3600;
    let expired = ctx
        .approval_workflow
        .get(tenant_id, approval_id, later)
        .await
        .unwrap()
        .expect("the request must still be readable after its deadline passes");
    assert_eq!(expired.status, ApprovalStatus::Expired);

    let updated = ctx.incidents.get_by_id(tenant_id, incident.id).await.unwrap().unwrap();
    assert_eq!(updated.status, IncidentStatus::InProgress);
}

#[tokio::test]
async fn deciding_an_already_decided_request_is_a_conflict() {
    let ctx = TestContext::new();
    let tenant_id = sentry_core::TenantId::new();
    let technician = ctx.seed_user(tenant_id, Role::Technician).await;
    let approver = ctx.seed_user(tenant_id, Role::TenantAdmin).await;
    let incident = ctx
        .seed_incident(tenant_id, "mem-leak", AlertSeverity::High, 1_000, None, Some(technician))
        .await;
    let runbook = ctx.seed_runbook(tenant_id, "mem-leak", RiskLevel::Medium, false).await;
    let requester = ctx.users.get_user_by_id(technician).await.unwrap().unwrap();

    let outcome = ctx
        .dispatcher
        .dispatch(tenant_id, incident.id, runbook.id, &requester, &["i-0004".to_string()])
        .await
        .unwrap();
    let approval_id = match outcome {
        DispatchOutcome::PendingApproval { approval_id } => approval_id,
        _ => panic!("expected approval gate"),
    };

    ctx.approval_workflow
        .decide(tenant_id, approval_id, Decision::Approve, approver, None, 1_050)
        .await
        .expect("first decision should succeed");

    let second = ctx
        .approval_workflow
        .decide(tenant_id, approval_id, Decision::Reject, approver, None, 1_060)
        .await;
    assert!(second.is_err(), "a second decision on the same request must fail");
}
