//! Authentication middleware.
//!
//! Verifies the bearer access token's signature and expiry, then populates
//! `RequestContext` from its claims so downstream handlers and the
//! permission checks in `sentry-auth` never need to touch a raw token
//! again. Access tokens are short-lived signed JWTs; this platform has no
//! jti blacklist, so a logout only revokes the refresh token that would
//! otherwise mint a new access token, and an already-issued access token
//! simply runs out its own clock.

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use sentry_core::{Permission, RequestContext, Role, TenantContext, TenantId, UserId};
use tracing::warn;
use uuid::Uuid;

use crate::state::AppState;

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = match extract_token(&request) {
        Some(token) => token,
        None => return Ok(unauthorized_response("Missing authorization token")),
    };

    let claims = match state.jwt.verify_access_token(&token) {
        Ok(claims) => claims,
        Err(e) => {
            warn!("token verification failed: {}", e);
            return Ok(unauthorized_response("Invalid or expired token"));
        }
    };

    let tenant_id = match Uuid::parse_str(&claims.tenant_id) {
        Ok(id) => TenantId(id),
        Err(_) => {
            warn!(tenant_id = %claims.tenant_id, "invalid tenant id in token claims");
            return Ok(unauthorized_response("Invalid token claims"));
        }
    };

    let user_id = match Uuid::parse_str(&claims.sub) {
        Ok(id) => UserId(id),
        Err(_) => {
            warn!(sub = %claims.sub, "invalid user id in token claims");
            return Ok(unauthorized_response("Invalid token claims"));
        }
    };

    let role = match parse_role(&claims.role) {
        Some(role) => role,
        None => {
            warn!(role = %claims.role, "unknown role in token claims");
            return Ok(unauthorized_response("Invalid token claims"));
        }
    };

    let permissions: Vec<Permission> = claims
        .permissions
        .iter()
        .filter_map(|p| {
            let parts: Vec<&str> = p.splitn(2, ':').collect();
            if parts.len() == 2 {
                Some(Permission::new(parts[0], parts[1]))
            } else {
                warn!(permission = %p, "invalid permission format in token claims");
                None
            }
        })
        .collect();

    // Carry over the request id the request-id middleware already assigned
    // rather than minting a second `RequestContext` that would shadow it.
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|existing| existing.request_id.clone())
        .unwrap_or_default();

    let context = RequestContext::new()
        .with_request_id(request_id)
        .with_tenant_context(TenantContext { tenant_id })
        .with_user_id(user_id)
        .with_role(role)
        .with_jti(claims.jti.clone())
        .with_permissions(permissions);

    request.extensions_mut().insert(context);

    Ok(next.run(request).await)
}

fn parse_role(role: &str) -> Option<Role> {
    match role {
        "system_admin" => Some(Role::SystemAdmin),
        "msp_admin" => Some(Role::MspAdmin),
        "tenant_admin" => Some(Role::TenantAdmin),
        "technician" => Some(Role::Technician),
        _ => None,
    }
}

fn extract_token(request: &Request) -> Option<String> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.to_string())
}

fn unauthorized_response(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_roles() {
        assert_eq!(parse_role("system_admin"), Some(Role::SystemAdmin));
        assert_eq!(parse_role("technician"), Some(Role::Technician));
        assert_eq!(parse_role("bogus"), None);
    }

    #[test]
    fn extracts_bearer_token() {
        let request = Request::builder()
            .uri("/test")
            .header(AUTHORIZATION, "Bearer abc.def.ghi")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(extract_token(&request), Some("abc.def.ghi".to_string()));
    }

    #[test]
    fn rejects_non_bearer_scheme() {
        let request = Request::builder()
            .uri("/test")
            .header(AUTHORIZATION, "Basic abc")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(extract_token(&request), None);
    }
}
