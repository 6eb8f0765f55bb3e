//! Alert listing (spec §6): `GET /alerts?…`.
//!
//! `AlertRepository` only exposes the query shapes the ingestion and
//! correlation paths need (uncorrelated-since, count-between); a plain
//! paginated listing goes straight to `Storage`.

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

pub fn alert_routes() -> Router<AppState> {
    Router::new().route("/", get(list_alerts))
}

#[derive(Debug, Deserialize)]
pub struct ListAlertsParams {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
    pub asset_name: Option<String>,
    pub correlated: Option<bool>,
}

fn default_page() -> usize {
    1
}

fn default_limit() -> usize {
    50
}

async fn list_alerts(
    State(state): State<AppState>,
    context: RequestContext,
    axum::extract::Query(params): axum::extract::Query<ListAlertsParams>,
) -> Result<Json<Value>, ApiError> {
    let tenant_id = context
        .tenant_id()
        .ok_or_else(|| sentry_core::Error::unauthorized("authentication required"))?;
    authz::require_permission(&context, "alert", "read", Some(tenant_id))?;

    let mut filters = vec![FieldFilter::tenant(tenant_id)];
    if let Some(asset_name) = &params.asset_name {
        filters.push(FieldFilter::eq("asset_name", asset_name.clone()));
    }
    if let Some(correlated) = params.correlated {
        filters.push(FieldFilter::eq("correlated", correlated));
    }

    let all = state
        .storage
        .find("alerts", &filters, Some(Sort::desc("timestamp")), None)
        .await?;
    let total = all.len();
    let offset = (params.page.saturating_sub(1)) * params.limit;
    let page: Vec<&Value> = all.iter().skip(offset).take(params.limit).collect();

    Ok(Json(json!({
        "alerts": page,
        "page": params.page,
        "limit": params.limit,
        "total": total,
    })))
}
