//! KPI snapshots (spec §6): `GET /metrics/realtime`, `GET /metrics/before-after`.

use axum::{extract::State, response::Json, routing::get, Router};
use chrono::Utc;
use sentry_core::RequestContext;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::authz;
use crate::error::ApiError;
use crate::state::AppState;

pub fn metrics_routes() -> Router<AppState> {
    Router::new()
        .route("/realtime", get(realtime))
        .route("/before-after", get(before_after))
}

#[derive(Debug, Deserialize)]
pub struct RealtimeParams {
    /// Window length in seconds, defaulting to the last hour.
    #[serde(default = "default_window_seconds")]
    pub window_seconds: i64,
}

fn default_window_seconds() -> i64 {
    3600
}

async fn realtime(
    State(state): State<AppState>,
    context: RequestContext,
    axum::extract::Query(params): axum::extract::Query<RealtimeParams>,
) -> Result<Json<Value>, ApiError> {
    let tenant_id = context
        .tenant_id()
        .ok_or_else(|| sentry_core::Error::unauthorized("authentication required"))?;
    authz::require_permission(&context, "metrics", "read", Some(tenant_id))?;

    let now = Utc::now().timestamp();
    let snapshot = state
        .metrics_aggregator
        .snapshot(tenant_id, now - params.window_seconds, now, None)
        .await?;

    Ok(Json(serde_json::to_value(&snapshot)?))
}

#[derive(Debug, Deserialize)]
pub struct BeforeAfterParams {
    pub pivot: i64,
    #[serde(default = "default_window_seconds")]
    pub window_seconds: i64,
}

async fn before_after(
    State(state): State<AppState>,
    context: RequestContext,
    axum::extract::Query(params): axum::extract::Query<BeforeAfterParams>,
) -> Result<Json<Value>, ApiError> {
    let tenant_id = context
        .tenant_id()
        .ok_or_else(|| sentry_core::Error::unauthorized("authentication required"))?;
    authz::require_permission(&context, "metrics", "read", Some(tenant_id))?;

    let before = state
        .metrics_aggregator
        .snapshot(
            tenant_id,
            params.pivot - params.window_seconds,
            params.pivot,
            None,
        )
        .await?;
    let after = state
        .metrics_aggregator
        .snapshot(
            tenant_id,
            params.pivot,
            params.pivot + params.window_seconds,
            None,
        )
        .await?;

    Ok(Json(json!({ "before": before, "after": after })))
}
