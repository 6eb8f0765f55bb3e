use sentry_core::{Permission, Role, TenantId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A platform user. `tenant_id` is `None` for global roles
/// (`system_admin`/`msp_admin`), matching spec's "tenant scope (empty = all)".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub tenant_id: Option<TenantId>,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    /// Explicit grants layered on top of the role's base set; never removes.
    pub permissions: HashSet<Permission>,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
    pub last_login_at: Option<i64>,
    /// Alert/incident signatures this technician has handled before, used
    /// by the assignment scorer's `expertise_match` term.
    pub expertise: HashSet<String>,
    /// Whether the technician is currently on shift, per their tenant's
    /// shift schedule. Not modeled further here (scheduling is out of
    /// scope); the assignment scorer reads it as a plain flag.
    pub on_shift: bool,
    /// Rolling average incident resolution time in minutes, maintained by
    /// whichever component closes an incident for this technician.
    pub avg_resolution_min: Option<f64>,
    pub version: u32,
}

impl User {
    pub fn effective_tenant_id(&self) -> Option<TenantId> {
        if self.role.is_global() {
            None
        } else {
            self.tenant_id
        }
    }
}

/// Opaque refresh token record. Only the SHA-256 hash of the secret is
/// ever persisted; the plaintext secret is returned to the client once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    pub id: sentry_core::RefreshTokenId,
    pub user_id: UserId,
    pub secret_hash: String,
    pub issued_at: i64,
    pub expires_at: i64,
    pub revoked: bool,
}

impl RefreshToken {
    pub fn is_valid(&self, now: i64) -> bool {
        !self.revoked && self.expires_at > now
    }
}
