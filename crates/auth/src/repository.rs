use crate::models::{RefreshToken, User};
use sentry_core::storage::{FieldFilter, Storage};
use sentry_core::{Error, Result, UserId};
use std::sync::Arc;

const USERS: &str = "users";
const REFRESH_TOKENS: &str = "refresh_tokens";

/// Storage-backed data access for users and refresh tokens, mirroring the
/// teacher's `AuthRepository` as a thin layer over the persistence boundary.
#[derive(Clone)]
pub struct AuthRepository {
    storage: Arc<dyn Storage>,
}

impl AuthRepository {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// `users` is a `GLOBAL_COLLECTIONS` entry (email is unique platform-wide,
    /// per spec §3), so this lookup needs no tenant filter.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let doc = self
            .storage
            .find_one(USERS, &[FieldFilter::eq("email", email)])
            .await?;
        doc.map(|v| serde_json::from_value(v).map_err(Error::from))
            .transpose()
    }

    pub async fn get_user_by_id(&self, user_id: UserId) -> Result<Option<User>> {
        let doc = self
            .storage
            .find_one(USERS, &[FieldFilter::eq("id", user_id.0.to_string())])
            .await?;
        doc.map(|v| serde_json::from_value(v).map_err(Error::from))
            .transpose()
    }

    pub async fn insert_user(&self, user: &User) -> Result<()> {
        self.storage
            .insert_one(USERS, user.id.0, serde_json::to_value(user)?)
            .await
    }

    /// Active users of a given role within a tenant — the assignment
    /// scorer's candidate pool (§4.G).
    pub async fn list_by_role(&self, tenant_id: sentry_core::TenantId, role: sentry_core::Role) -> Result<Vec<User>> {
        let docs = self
            .storage
            .find(
                USERS,
                &[
                    FieldFilter::eq("tenant_id", tenant_id.0.to_string()),
                    FieldFilter::eq(
                        "role",
                        serde_json::to_value(role).expect("Role always serializes"),
                    ),
                    FieldFilter::eq("is_active", true),
                ],
                None,
                None,
            )
            .await?;
        docs.into_iter()
            .map(|v| serde_json::from_value(v).map_err(Error::from))
            .collect()
    }

    pub async fn touch_last_login(&self, user_id: UserId, now: i64) -> Result<()> {
        self.storage
            .update_one(
                USERS,
                &[FieldFilter::eq("id", user_id.0.to_string())],
                serde_json::json!({ "last_login_at": now }),
            )
            .await?;
        Ok(())
    }

    /// Active global-role users (`system_admin`/`msp_admin`) — the SLA
    /// monitor's and approval workflow's notification fan-out for the top
    /// rung of the escalation ladder (§4.J), which has no single tenant to
    /// scope by.
    pub async fn list_global_by_role(&self, role: sentry_core::Role) -> Result<Vec<User>> {
        let docs = self
            .storage
            .find(
                USERS,
                &[
                    FieldFilter {
                        field: "tenant_id".to_string(),
                        filter: sentry_core::storage::Filter::Eq(serde_json::Value::Null),
                    },
                    FieldFilter::eq(
                        "role",
                        serde_json::to_value(role).expect("Role always serializes"),
                    ),
                    FieldFilter::eq("is_active", true),
                ],
                None,
                None,
            )
            .await?;
        docs.into_iter()
            .map(|v| serde_json::from_value(v).map_err(Error::from))
            .collect()
    }

    pub async fn insert_refresh_token(&self, token: &RefreshToken) -> Result<()> {
        self.storage
            .insert_one(REFRESH_TOKENS, token.id.0, serde_json::to_value(token)?)
            .await
    }

    pub async fn get_refresh_token(&self, id: sentry_core::RefreshTokenId) -> Result<Option<RefreshToken>> {
        let doc = self
            .storage
            .find_one(REFRESH_TOKENS, &[FieldFilter::eq("id", id.0.to_string())])
            .await?;
        doc.map(|v| serde_json::from_value(v).map_err(Error::from))
            .transpose()
    }

    pub async fn revoke_refresh_token(&self, id: sentry_core::RefreshTokenId) -> Result<()> {
        self.storage
            .update_one(
                REFRESH_TOKENS,
                &[FieldFilter::eq("id", id.0.to_string())],
                serde_json::json!({ "revoked": true }),
            )
            .await?;
        Ok(())
    }

    /// Revokes every outstanding refresh token for a user (logout-all, §4.L).
    pub async fn revoke_all_refresh_tokens(&self, user_id: UserId) -> Result<usize> {
        self.storage
            .update_many(
                REFRESH_TOKENS,
                &[FieldFilter::eq("user_id", user_id.0.to_string())],
                serde_json::json!({ "revoked": true }),
            )
            .await
    }
}
