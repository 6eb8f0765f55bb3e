//! Incident listing and lifecycle actions (spec §6): `/incidents`,
//! `/incidents/correlate`, `/incidents/{id}/assign`,
//! `/incidents/{id}/execute-runbook`.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use sentry_core::{
    storage::{FieldFilter, Sort},
    IncidentId, RequestContext, RunbookId,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::authz;
use crate::error::ApiError;
use crate::state::AppState;

pub fn incident_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_incidents))
        .route("/correlate", post(correlate))
        .route("/{id}/assign", post(assign))
        .route("/{id}/execute-runbook", post(execute_runbook))
}

#[derive(Debug, Deserialize)]
pub struct ListIncidentsParams {
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

async fn list_incidents(
    State(state): State<AppState>,
    context: RequestContext,
    Query(params): Query<ListIncidentsParams>,
) -> Result<Json<Value>, ApiError> {
    let tenant_id = context
        .tenant_id()
        .ok_or_else(|| sentry_core::Error::unauthorized("authentication required"))?;
    authz::require_permission(&context, "incident", "read", Some(tenant_id))?;

    let mut filters = vec![FieldFilter::tenant(tenant_id)];
    if let Some(status) = &params.status {
        filters.push(FieldFilter::eq("status", status.clone()));
    }

    let all = state
        .storage
        .find("incidents", &filters, Some(Sort::desc("created_at")), None)
        .await?;
    let total = all.len();
    let offset = (params.page.saturating_sub(1)) * params.limit;
    let page: Vec<&Value> = all.iter().skip(offset).take(params.limit).collect();

    Ok(Json(json!({
        "incidents": page,
        "page": params.page,
        "limit": params.limit,
        "total": total,
    })))
}

async fn correlate(
    State(state): State<AppState>,
    context: RequestContext,
) -> Result<Json<Value>, ApiError> {
    let tenant_id = context
        .tenant_id()
        .ok_or_else(|| sentry_core::Error::unauthorized("authentication required"))?;
    authz::require_permission(&context, "incident", "execute_runbook", Some(tenant_id))?;

    let tenant = state
        .tenants
        .get_by_id(tenant_id)
        .await?
        .ok_or_else(|| sentry_core::Error::not_found("tenant not found"))?;

    let outcome = state
        .correlator
        .run(
            tenant_id,
            &tenant.correlation,
            &tenant.critical_assets,
            Utc::now().timestamp(),
        )
        .await?;

    Ok(Json(json!({
        "incidents_created": outcome.incidents_created,
        "incidents_updated": outcome.incidents_updated,
    })))
}

async fn assign(
    State(state): State<AppState>,
    context: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let tenant_id = context
        .tenant_id()
        .ok_or_else(|| sentry_core::Error::unauthorized("authentication required"))?;
    authz::require_permission(&context, "incident", "assign", Some(tenant_id))?;

    let incident = state
        .incidents
        .get_by_id(tenant_id, IncidentId(id))
        .await?
        .ok_or_else(|| sentry_core::Error::not_found("incident not found"))?;

    let tenant = state
        .tenants
        .get_by_id(tenant_id)
        .await?
        .ok_or_else(|| sentry_core::Error::not_found("tenant not found"))?;

    let assigned = state
        .assigner
        .assign(tenant_id, incident, &tenant.sla, Utc::now().timestamp())
        .await?;

    match assigned {
        Some(incident) => Ok(Json(serde_json::to_value(&incident)?)),
        None => Err(sentry_core::Error::conflict("no eligible technician available").into()),
    }
}

#[derive(Debug, Deserialize)]
pub struct ExecuteRunbookRequest {
    pub runbook_id: Uuid,
    #[serde(default)]
    pub target_hosts: Vec<String>,
}

async fn execute_runbook(
    State(state): State<AppState>,
    context: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<ExecuteRunbookRequest>,
) -> Result<Json<Value>, ApiError> {
    let tenant_id = context
        .tenant_id()
        .ok_or_else(|| sentry_core::Error::unauthorized("authentication required"))?;
    authz::require_permission(&context, "incident", "execute_runbook", Some(tenant_id))?;

    let user_id = context
        .user_id
        .ok_or_else(|| sentry_core::Error::unauthorized("authentication required"))?;
    let requester = state
        .auth_repository
        .get_user_by_id(user_id)
        .await?
        .ok_or_else(|| sentry_core::Error::not_found("user not found"))?;

    let outcome = state
        .dispatcher
        .dispatch(
            tenant_id,
            IncidentId(id),
            RunbookId(payload.runbook_id),
            &requester,
            &payload.target_hosts,
        )
        .await?;

    Ok(Json(match outcome {
        sentry_remediation::DispatchOutcome::Executing { execution_id } => {
            crate::poller::spawn_poller(state.clone(), tenant_id, IncidentId(id), execution_id);
            json!({
                "status": "executing",
                "execution_id": execution_id,
            })
        }
        sentry_remediation::DispatchOutcome::PendingApproval { approval_id } => json!({
            "status": "pending_approval",
            "approval_id": approval_id,
        }),
    }))
}
