#![cfg(test)]
//! Shared fixtures for in-crate route tests: a fully wired `AppState`
//! backed by `InMemoryStorage`, built the same way `main.rs` wires a live
//! server, plus helpers for seeding tenants and users used across the
//! handler test modules.

use axum::Router;
use sentry_auth::User;
use sentry_core::security::PasswordHasher;
use sentry_core::{
    AggregationKeyKind, Config, CorrelationConfig, RateLimitConfig, Role, SlaConfig, Tenant,
    TenantId, TenantStatus, UserId, WebhookSecurityConfig,
};
use std::collections::HashSet;

use sentry_core::config::{
    AppConfig, CorrelationDefaults, CorsConfig, JwtConfig, MetricsConfig, RateLimitDefaults,
    SecurityConfig, ServerConfig,
};
use crate::state::AppState;

pub fn test_config() -> Config {
    Config {
        jwt: JwtConfig {
            secret: "test-only-secret-at-least-32-bytes-long".to_string(),
            access_token_expiry: 1800,
            refresh_token_expiry: 604_800,
        },
        security: SecurityConfig {
            argon2_memory_cost: 19456,
            argon2_time_cost: 2,
            argon2_parallelism: 1,
        },
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            workers: 1,
            request_timeout_seconds: 15,
            storage_call_timeout_seconds: 5,
            shutdown_timeout_seconds: 30,
        },
        rate_limit: RateLimitDefaults {
            requests_per_minute: 300,
            burst_size: 300,
            enabled: true,
        },
        correlation: CorrelationDefaults {
            time_window_seconds: 300,
            aggregation_key: "asset_signature".to_string(),
            auto_correlate: true,
            sweep_interval_seconds: 30,
        },
        app: AppConfig {
            environment: "development".to_string(),
            log_level: "info".to_string(),
            base_url: "http://localhost:8080".to_string(),
            sla_scan_interval_seconds: 300,
            ttl_reaper_interval_seconds: 3600,
            tenant_config_cache_ttl_seconds: 60,
        },
        metrics: MetricsConfig {
            enabled: false,
            port: 9090,
            path: "/metrics".to_string(),
            namespace: "sentry".to_string(),
        },
        cors: CorsConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            allowed_methods: vec!["GET".to_string(), "POST".to_string()],
            allowed_headers: vec!["*".to_string()],
            expose_headers: vec![],
            max_age: Some(3600),
            allow_credentials: false,
        },
    }
}

pub async fn test_state() -> AppState {
    crate::bootstrap(test_config())
        .await
        .expect("bootstrap should succeed with a fresh in-memory backend")
}

pub fn test_app(state: AppState) -> Router {
    crate::create_app(state).expect("router should build from a valid state")
}

pub async fn seed_tenant(state: &AppState, api_key: &str) -> TenantId {
    let tenant = Tenant {
        id: TenantId::new(),
        name: "Acme MSP".to_string(),
        api_key: api_key.to_string(),
        hmac_secret: None,
        aws_integration: None,
        critical_assets: Default::default(),
        rate_limit: RateLimitConfig {
            requests_per_minute: 300,
            burst_size: 300,
            enabled: true,
        },
        correlation: CorrelationConfig {
            time_window_seconds: 300,
            aggregation_key: AggregationKeyKind::AssetSignature,
            auto_correlate: true,
        },
        webhook_security: WebhookSecurityConfig {
            hmac_enabled: false,
            secret: String::new(),
            timestamp_skew_seconds: 300,
        },
        sla: SlaConfig {
            critical_minutes: 30,
            high_minutes: 120,
            medium_minutes: 480,
            low_minutes: 1440,
        },
        status: TenantStatus::Active,
        created_at: 0,
        version: 0,
    };
    state
        .tenants
        .insert(&tenant)
        .await
        .expect("tenant insert should succeed");
    tenant.id
}

pub async fn seed_user(
    state: &AppState,
    tenant_id: Option<TenantId>,
    email: &str,
    password: &str,
    role: Role,
) -> UserId {
    let password_hasher = PasswordHasher::new(&test_config().security)
        .expect("password hasher config should be valid");
    let hash = password_hasher
        .hash_password(password)
        .expect("hash should succeed");

    let user = User {
        id: UserId::new(),
        tenant_id,
        email: email.to_string(),
        password_hash: hash,
        role,
        permissions: HashSet::new(),
        is_active: true,
        created_at: 0,
        updated_at: 0,
        last_login_at: None,
        expertise: HashSet::new(),
        on_shift: true,
        avg_resolution_min: None,
        version: 0,
    };
    state
        .auth_repository
        .insert_user(&user)
        .await
        .expect("user insert should succeed");
    user.id
}
