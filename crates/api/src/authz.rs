//! Handler-level permission check against the authenticated `RequestContext`.
//!
//! Mirrors `sentry_auth::rbac::check_permission`'s rule (explicit grants are
//! additive over the role's base set, tenant scope must match unless the
//! role is global) but works directly off the token-derived context instead
//! of a loaded `User`, since most handlers never need the full user record.

use sentry_core::{Permission, RequestContext, TenantId};

use crate::error::ApiError;

pub fn require_permission(
    context: &RequestContext,
    resource: &str,
    action: &str,
    target_tenant: Option<TenantId>,
) -> Result<(), ApiError> {
    let role = context
        .role
        .ok_or_else(|| sentry_core::Error::unauthorized("authentication required"))?;

    if !role.is_global() {
        match (context.tenant_id(), target_tenant) {
            (Some(ctx_tenant), Some(target)) if ctx_tenant == target => {}
            _ => return Err(sentry_core::Error::forbidden("tenant scope mismatch").into()),
        }
    }

    let permission = Permission::new(resource, action);
    if context.permissions.contains(&permission) {
        return Ok(());
    }
    if sentry_auth::base_permission_set(role).contains(&permission) {
        return Ok(());
    }

    Err(sentry_core::Error::forbidden(format!(
        "missing required permission: {}:{}",
        resource, action
    ))
    .into())
}
