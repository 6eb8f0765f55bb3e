//! Permission model for §4.L: `(user, action, target) -> bool`.
//!
//! A role implies a base permission set; a user's explicit `permissions`
//! are additive on top of it, never subtractive.

use crate::models::User;
use sentry_core::{Permission, Role, TenantId};

/// Resource/action pairs granted to every member of a role, independent of
/// any per-user explicit grant. Mirrors the HTTP API surface in spec §6.
pub fn base_permission_set(role: Role) -> Vec<Permission> {
    let mut perms = vec![
        Permission::new("alert", "read"),
        Permission::new("incident", "read"),
        Permission::new("runbook", "read"),
        Permission::new("approval_request", "read"),
        Permission::new("metrics", "read"),
    ];

    match role {
        Role::Technician => {
            perms.push(Permission::new("incident", "assign"));
            perms.push(Permission::new("approval_request", "decide_low"));
        }
        Role::TenantAdmin => {
            perms.push(Permission::new("incident", "assign"));
            perms.push(Permission::new("incident", "execute_runbook"));
            perms.push(Permission::new("approval_request", "decide_low"));
            perms.push(Permission::new("approval_request", "decide_medium"));
            perms.push(Permission::new("audit_log", "read"));
        }
        Role::MspAdmin | Role::SystemAdmin => {
            perms.push(Permission::new("incident", "assign"));
            perms.push(Permission::new("incident", "execute_runbook"));
            perms.push(Permission::new("approval_request", "decide_low"));
            perms.push(Permission::new("approval_request", "decide_medium"));
            perms.push(Permission::new("approval_request", "decide_high"));
            perms.push(Permission::new("audit_log", "read"));
            perms.push(Permission::new("tenant", "read"));
            perms.push(Permission::new("tenant", "write"));
        }
    }

    perms
}

/// A target resource a permission check is evaluated against. `tenant_id`
/// of `None` denotes a platform-level target (e.g. tenant CRUD itself).
pub struct Target {
    pub tenant_id: Option<TenantId>,
}

/// Pure function: does `user` hold `permission` on `target`?
///
/// Tenant scope must match `target.tenant_id` unless the user's role is
/// global (`system_admin`/`msp_admin`), per spec §4.L.
pub fn check_permission(user: &User, permission: &Permission, target: &Target) -> bool {
    if !user.role.is_global() {
        match (user.effective_tenant_id(), target.tenant_id) {
            (Some(user_tenant), Some(target_tenant)) if user_tenant == target_tenant => {}
            _ => return false,
        }
    }

    if user.permissions.contains(permission) {
        return true;
    }

    base_permission_set(user.role).contains(permission)
}
