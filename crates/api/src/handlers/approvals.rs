//! Approval request listing and decisions (spec §6): `GET/POST /approval-requests`.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use sentry_core::{
    storage::{FieldFilter, Sort},
    ApprovalRequestId, RequestContext,
};
use sentry_remediation::Decision;
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::authz;
use crate::error::ApiError;
use crate::state::AppState;

pub fn approval_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_approvals))
        .route("/{id}/decide", post(decide))
}

#[derive(Debug, Deserialize)]
pub struct ListApprovalsParams {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
    pub status: Option<String>,
}

fn default_page() -> usize {
    1
}

fn default_limit() -> usize {
    50
}

async fn list_approvals(
    State(state): State<AppState>,
    context: RequestContext,
    Query(params): Query<ListApprovalsParams>,
) -> Result<Json<Value>, ApiError> {
    let tenant_id = context
        .tenant_id()
        .ok_or_else(|| sentry_core::Error::unauthorized("authentication required"))?;
    authz::require_permission(&context, "approval_request", "read", Some(tenant_id))?;

    let mut filters = vec![FieldFilter::tenant(tenant_id)];
    if let Some(status) = &params.status {
        filters.push(FieldFilter::eq("status", status.clone()));
    }

    let all = state
        .storage
        .find(
            "approval_requests",
            &filters,
            Some(Sort::desc("created_at")),
            None,
        )
        .await?;
    let total = all.len();
    let offset = (params.page.saturating_sub(1)) * params.limit;
    let page: Vec<&Value> = all.iter().skip(offset).take(params.limit).collect();

    Ok(Json(json!({
        "approval_requests": page,
        "page": params.page,
        "limit": params.limit,
        "total": total,
    })))
}

#[derive(Debug, Deserialize)]
pub struct DecideApprovalRequest {
    pub decision: String,
    pub notes: Option<String>,
}

async fn decide(
    State(state): State<AppState>,
    context: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<DecideApprovalRequest>,
) -> Result<Json<Value>, ApiError> {
    let tenant_id = context
        .tenant_id()
        .ok_or_else(|| sentry_core::Error::unauthorized("authentication required"))?;

    let approval = state
        .approval_workflow
        .get(tenant_id, ApprovalRequestId(id), Utc::now().timestamp())
        .await?
        .ok_or_else(|| sentry_core::Error::not_found("approval request not found"))?;

    let action = match approval.risk {
        sentry_core::RiskLevel::Low => "decide_low",
        sentry_core::RiskLevel::Medium => "decide_medium",
        sentry_core::RiskLevel::High => "decide_high",
    };
    authz::require_permission(&context, "approval_request", action, Some(tenant_id))?;

    let decision = match payload.decision.as_str() {
        "approve" => Decision::Approve,
        "reject" => Decision::Reject,
        other => {
            return Err(
                sentry_core::Error::validation(format!("unknown decision: {other}")).into(),
            )
        }
    };

    let user_id = context
        .user_id
        .ok_or_else(|| sentry_core::Error::unauthorized("authentication required"))?;

    let decided = state
        .approval_workflow
        .decide(
            tenant_id,
            ApprovalRequestId(id),
            decision,
            user_id,
            payload.notes,
            Utc::now().timestamp(),
        )
        .await?;

    // An approval alone only flips the request's own status; resuming the
    // gated runbook is this handler's job, mirroring how `execute_runbook`
    // drives a fresh low-risk request to the same `begin_execution` call.
    if decision == Decision::Approve {
        if let (Some(incident), Some(runbook)) = (
            state.incidents.get_by_id(tenant_id, decided.incident_id).await?,
            state.runbooks.get_by_id(tenant_id, decided.runbook_id).await?,
        ) {
            let outcome = state
                .dispatcher
                .begin_execution(tenant_id, &incident, &runbook, &decided.target_hosts)
                .await?;
            if let sentry_remediation::DispatchOutcome::Executing { execution_id } = outcome {
                crate::poller::spawn_poller(state.clone(), tenant_id, decided.incident_id, execution_id);
            }
        }
    }

    Ok(Json(serde_json::to_value(&decided)?))
}
