//! Tenant administration (spec §6): `/tenants`, `/tenants/{id}`.
//!
//! `TenantRepository` has no generic list or delete method (it only ever
//! needed lookup-by-id/api_key plus a couple of targeted field updates), so
//! the list and delete handlers fall back to `Storage` directly, the same
//! way the teacher's repositories do when a route needs a query shape the
//! domain repository was never built for.

use axum::{
    extract::{Path, Query, State},
    response::Json,
    routing::{get, post},
    Router,
};
use chrono::Utc;
use sentry_core::{
    storage::{FieldFilter, Sort},
    RequestContext, Tenant, TenantId,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::authz;
use crate::error::ApiError;
use crate::state::AppState;

pub fn tenant_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tenants).post(create_tenant))
        .route(
            "/{id}",
            get(get_tenant).put(update_tenant).delete(delete_tenant),
        )
}

#[derive(Debug, Deserialize)]
pub struct PaginationParams {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_page() -> usize {
    1
}

fn default_limit() -> usize {
    50
}

async fn list_tenants(
    State(state): State<AppState>,
    context: RequestContext,
    Query(pagination): Query<PaginationParams>,
) -> Result<Json<Value>, ApiError> {
    authz::require_permission(&context, "tenant", "read", None)?;

    let offset = (pagination.page.saturating_sub(1)) * pagination.limit;
    let all = state
        .storage
        .find("tenants", &[], Some(Sort::asc("created_at")), None)
        .await?;
    let total = all.len();
    let page: Vec<&Value> = all.iter().skip(offset).take(pagination.limit).collect();

    Ok(Json(json!({
        "tenants": page,
        "page": pagination.page,
        "limit": pagination.limit,
        "total": total,
    })))
}

#[derive(Debug, Deserialize)]
pub struct CreateTenantRequest {
    pub name: String,
    pub rate_limit: sentry_core::RateLimitConfig,
    pub correlation: sentry_core::CorrelationConfig,
    pub webhook_security: sentry_core::WebhookSecurityConfig,
    pub sla: sentry_core::SlaConfig,
}

async fn create_tenant(
    State(state): State<AppState>,
    context: RequestContext,
    Json(payload): Json<CreateTenantRequest>,
) -> Result<Json<Value>, ApiError> {
    authz::require_permission(&context, "tenant", "write", None)?;

    let tenant = Tenant {
        id: TenantId(Uuid::new_v4()),
        name: payload.name,
        api_key: generate_api_key(),
        hmac_secret: None,
        aws_integration: None,
        critical_assets: Default::default(),
        rate_limit: payload.rate_limit,
        correlation: payload.correlation,
        webhook_security: payload.webhook_security,
        sla: payload.sla,
        status: sentry_core::TenantStatus::Active,
        created_at: Utc::now().timestamp(),
        version: 0,
    };
    state.tenants.insert(&tenant).await?;

    Ok(Json(serde_json::to_value(&tenant)?))
}

async fn get_tenant(
    State(state): State<AppState>,
    context: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    authz::require_permission(&context, "tenant", "read", Some(TenantId(id)))?;

    let tenant = state
        .tenants
        .get_by_id(TenantId(id))
        .await?
        .ok_or_else(|| sentry_core::Error::not_found("tenant not found"))?;

    Ok(Json(serde_json::to_value(&tenant)?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateTenantRequest {
    pub name: Option<String>,
    pub rate_limit: Option<sentry_core::RateLimitConfig>,
    pub correlation: Option<sentry_core::CorrelationConfig>,
    pub sla: Option<sentry_core::SlaConfig>,
}

async fn update_tenant(
    State(state): State<AppState>,
    context: RequestContext,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTenantRequest>,
) -> Result<Json<Value>, ApiError> {
    authz::require_permission(&context, "tenant", "write", Some(TenantId(id)))?;

    let mut patch = json!({});
    if let Some(name) = payload.name {
        patch["name"] = json!(name);
    }
    if let Some(rate_limit) = payload.rate_limit {
        patch["rate_limit"] = serde_json::to_value(rate_limit)?;
    }
    if let Some(correlation) = payload.correlation {
        patch["correlation"] = serde_json::to_value(correlation)?;
    }
    if let Some(sla) = payload.sla {
        patch["sla"] = serde_json::to_value(sla)?;
    }

    let updated = state
        .storage
        .update_one(
            "tenants",
            &[FieldFilter::eq("id", id.to_string())],
            patch,
        )
        .await?;
    if !updated {
        return Err(sentry_core::Error::not_found("tenant not found").into());
    }

    let tenant = state
        .tenants
        .get_by_id(TenantId(id))
        .await?
        .ok_or_else(|| sentry_core::Error::not_found("tenant not found"))?;
    Ok(Json(serde_json::to_value(&tenant)?))
}

async fn delete_tenant(
    State(state): State<AppState>,
    context: RequestContext,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    authz::require_permission(&context, "tenant", "write", Some(TenantId(id)))?;

    let deleted = state
        .storage
        .delete_one("tenants", &[FieldFilter::eq("id", id.to_string())])
        .await?;
    if !deleted {
        return Err(sentry_core::Error::not_found("tenant not found").into());
    }

    Ok(Json(json!({ "success": true })))
}

fn generate_api_key() -> String {
    format!("sk_{}", Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use crate::test_support::{seed_user, test_app, test_state};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use sentry_auth::LoginRequest;
    use sentry_core::Role;
    use tower::ServiceExt;

    async fn access_token(state: &crate::state::AppState, email: &str) -> String {
        state
            .auth_service
            .login(LoginRequest {
                email: email.to_string(),
                password: "SomePassword123!".to_string(),
            })
            .await
            .expect("login should succeed")
            .access_token
    }

    #[tokio::test]
    async fn technician_cannot_list_all_tenants() {
        let state = test_state().await;
        seed_user(&state, Some(sentry_core::TenantId::new()), "tech@example.com", "SomePassword123!", Role::Technician).await;
        let token = access_token(&state, "tech@example.com").await;
        let app = test_app(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/tenants")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn system_admin_can_list_tenants() {
        let state = test_state().await;
        seed_user(&state, None, "admin@example.com", "SomePassword123!", Role::SystemAdmin).await;
        let token = access_token(&state, "admin@example.com").await;
        let app = test_app(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/tenants")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_token_is_unauthorized() {
        let state = test_state().await;
        let app = test_app(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/tenants")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
