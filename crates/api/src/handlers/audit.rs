//! Read-only audit log access (spec §6): `GET /audit-logs`.

use axum::{extract::State, response::Json, routing::get, Router};
use sentry_core::{
    storage::{FieldFilter, Sort},
    RequestContext,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::authz;
use crate::error::ApiError;
use crate::state::AppState;

pub fn audit_routes() -> Router<AppState> {
    Router::new().route("/", get(list_audit_logs))
}

#[derive(Debug, Deserialize)]
pub struct ListAuditLogsParams {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
    pub action: Option<String>,
}

fn default_page() -> usize {
    1
}

fn default_limit() -> usize {
    50
}

async fn list_audit_logs(
    State(state): State<AppState>,
    context: RequestContext,
    axum::extract::Query(params): axum::extract::Query<ListAuditLogsParams>,
) -> Result<Json<Value>, ApiError> {
    let tenant_id = context
        .tenant_id()
        .ok_or_else(|| sentry_core::Error::unauthorized("authentication required"))?;
    authz::require_permission(&context, "audit_log", "read", Some(tenant_id))?;

    let mut filters = vec![FieldFilter::tenant(tenant_id)];
    if let Some(action) = &params.action {
        filters.push(FieldFilter::eq("action", action.clone()));
    }

    let all = state
        .storage
        .find("audit_logs", &filters, Some(Sort::desc("timestamp")), None)
        .await?;
    let total = all.len();
    let offset = (params.page.saturating_sub(1)) * params.limit;
    let page: Vec<&Value> = all.iter().skip(offset).take(params.limit).collect();

    Ok(Json(json!({
        "audit_logs": page,
        "page": params.page,
        "limit": params.limit,
        "total": total,
    })))
}
