//! Authentication service: login, refresh, logout-all (§4.L).
//!
//! Orchestrates password verification, JWT issuance, opaque refresh-token
//! rotation and audit logging, mirroring the teacher's `AuthService` shape
//! with the 2FA/email/registration machinery removed.

use crate::dto::{LoginRequest, TokenPairResponse};
use crate::models::{RefreshToken, User};
use crate::repository::AuthRepository;
use chrono::Utc;
use sentry_core::security::{JwtService, PasswordHasher};
use sentry_core::{AuditLogger, AuditStatus, Error, Permission, RefreshTokenId, Result, UserId};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

pub struct AuthService {
    repository: AuthRepository,
    password_hasher: PasswordHasher,
    jwt_service: JwtService,
    audit: Arc<AuditLogger>,
}

impl AuthService {
    pub fn new(
        repository: AuthRepository,
        password_hasher: PasswordHasher,
        jwt_service: JwtService,
        audit: Arc<AuditLogger>,
    ) -> Self {
        Self {
            repository,
            password_hasher,
            jwt_service,
            audit,
        }
    }

    /// Email+password login; issues a fresh access/refresh pair.
    pub async fn login(&self, request: LoginRequest) -> Result<TokenPairResponse> {
        request
            .validate()
            .map_err(|e| Error::validation(e.to_string()))?;

        let user = self
            .repository
            .get_user_by_email(&request.email)
            .await?
            .ok_or_else(|| Error::unauthorized("invalid credentials"))?;

        if !user.is_active {
            return Err(Error::unauthorized("account disabled"));
        }

        if !self
            .password_hasher
            .verify_password(&request.password, &user.password_hash)?
        {
            return Err(Error::unauthorized("invalid credentials"));
        }

        let response = self.issue_token_pair(&user).await?;

        self.repository
            .touch_last_login(user.id, Utc::now().timestamp())
            .await?;

        self.audit
            .log(AuditLogger::entry(
                user.effective_tenant_id().unwrap_or_else(sentry_core::TenantId::platform),
                Some(user.id),
                "auth.login",
                "user",
                Some(user.id.0),
                AuditStatus::Success,
                None,
            ))
            .await;

        info!(user_id = %user.id, "login succeeded");
        Ok(response)
    }

    /// Verifies and rotates a refresh token: the old one is revoked, a new
    /// pair issued, per §4.L and §3's `RefreshToken` lifecycle.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPairResponse> {
        let (id, secret) = parse_opaque_token(refresh_token)?;

        let stored = self
            .repository
            .get_refresh_token(id)
            .await?
            .ok_or_else(|| Error::unauthorized("invalid refresh token"))?;

        let now = Utc::now().timestamp();
        if !stored.is_valid(now) {
            return Err(Error::unauthorized("refresh token expired or revoked"));
        }

        let expected_hash = JwtService::hash_refresh_secret(&secret);
        if expected_hash != stored.secret_hash {
            return Err(Error::unauthorized("invalid refresh token"));
        }

        let user = self
            .repository
            .get_user_by_id(stored.user_id)
            .await?
            .ok_or_else(|| Error::unauthorized("invalid refresh token"))?;

        if !user.is_active {
            return Err(Error::unauthorized("account disabled"));
        }

        self.repository.revoke_refresh_token(id).await?;

        let response = self.issue_token_pair(&user).await?;

        self.audit
            .log(AuditLogger::entry(
                user.effective_tenant_id().unwrap_or_else(sentry_core::TenantId::platform),
                Some(user.id),
                "auth.refresh",
                "refresh_token",
                Some(id.0),
                AuditStatus::Success,
                None,
            ))
            .await;

        Ok(response)
    }

    /// Revokes every outstanding refresh token for a user.
    pub async fn logout_all(&self, user_id: UserId) -> Result<()> {
        let revoked = self.repository.revoke_all_refresh_tokens(user_id).await?;

        self.audit
            .log(AuditLogger::entry(
                sentry_core::TenantId::platform(),
                Some(user_id),
                "auth.logout_all",
                "user",
                Some(user_id.0),
                AuditStatus::Success,
                Some(serde_json::json!({ "revoked_count": revoked })),
            ))
            .await;

        info!(user_id = %user_id, revoked, "logout-all revoked refresh tokens");
        Ok(())
    }

    async fn issue_token_pair(&self, user: &User) -> Result<TokenPairResponse> {
        let permissions: Vec<String> = user
            .permissions
            .iter()
            .map(Permission::as_string)
            .collect();

        let tenant_claim = user
            .effective_tenant_id()
            .map(|t| t.0.to_string())
            .unwrap_or_default();

        let access_token = self.jwt_service.generate_access_token(
            &user.id.to_string(),
            &tenant_claim,
            &user.role.to_string(),
            permissions,
        )?;

        let (secret, secret_hash, expires_at) = self.jwt_service.generate_refresh_secret();
        let token_id = RefreshTokenId::new();

        self.repository
            .insert_refresh_token(&RefreshToken {
                id: token_id,
                user_id: user.id,
                secret_hash,
                issued_at: Utc::now().timestamp(),
                expires_at: expires_at.timestamp(),
                revoked: false,
            })
            .await?;

        Ok(TokenPairResponse {
            access_token,
            refresh_token: format!("{}.{}", token_id.0, secret),
            token_type: "Bearer",
            expires_in: self.jwt_service.access_token_expiry().num_seconds(),
        })
    }
}

fn parse_opaque_token(token: &str) -> Result<(RefreshTokenId, String)> {
    let (id_part, secret_part) = token
        .split_once('.')
        .ok_or_else(|| Error::unauthorized("malformed refresh token"))?;
    let id = Uuid::parse_str(id_part)
        .map(RefreshTokenId)
        .map_err(|_| Error::unauthorized("malformed refresh token"))?;
    if secret_part.is_empty() {
        return Err(Error::unauthorized("malformed refresh token"));
    }
    Ok((id, secret_part.to_string()))
}
