//! Authentication handlers: login, token refresh, logout-all (spec §6).

use axum::{
    extract::State,
    middleware,
    response::Json,
    routing::post,
    Router,
};
use sentry_core::RequestContext;
use sentry_auth::dto::{LoginRequest, RefreshRequest};
use serde_json::{json, Value};

use crate::api_middleware::auth_middleware;
use crate::error::ApiError;
use crate::state::AppState;

/// `login`/`refresh` take no bearer token; `logout-all` needs the caller's
/// identity, so it carries its own auth layer rather than sitting behind
/// the router-wide one `main.rs` applies to every other route group.
pub fn auth_routes(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/logout-all", post(logout_all))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .merge(protected)
}

async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<Value>, ApiError> {
    let tokens = state.auth_service.login(payload).await?;
    Ok(Json(json!({
        "access_token": tokens.access_token,
        "refresh_token": tokens.refresh_token,
        "token_type": tokens.token_type,
        "expires_in": tokens.expires_in,
    })))
}

async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<Value>, ApiError> {
    let tokens = state.auth_service.refresh(&payload.refresh_token).await?;
    Ok(Json(json!({
        "access_token": tokens.access_token,
        "refresh_token": tokens.refresh_token,
        "token_type": tokens.token_type,
        "expires_in": tokens.expires_in,
    })))
}

async fn logout_all(
    State(state): State<AppState>,
    context: RequestContext,
) -> Result<Json<Value>, ApiError> {
    let user_id = context
        .user_id
        .ok_or_else(|| sentry_core::Error::unauthorized("authentication required"))?;
    state.auth_service.logout_all(user_id).await?;
    Ok(Json(json!({ "success": true })))
}
