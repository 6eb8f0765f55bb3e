use sentry_auth::{AuthRepository, AuthService};
use sentry_core::config::{JwtConfig, SecurityConfig};
use sentry_core::security::{JwtService, PasswordHasher};
use sentry_core::storage::InMemoryStorage;
use sentry_core::{AuditLogger, Storage};
use std::sync::Arc;

pub struct TestContext {
    pub auth_service: AuthService,
    pub repository: AuthRepository,
    pub password_hasher: PasswordHasher,
}

impl TestContext {
    pub fn new() -> Self {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let repository = AuthRepository::new(storage.clone());

        let password_hasher = PasswordHasher::new(&SecurityConfig {
            argon2_memory_cost: 19456,
            argon2_time_cost: 2,
            argon2_parallelism: 1,
        })
        .expect("password hasher config should be valid");

        let jwt_service = JwtService::new(&JwtConfig {
            secret: "integration-test-secret-at-least-32-bytes".to_string(),
            access_token_expiry: 1800,
            refresh_token_expiry: 604_800,
        })
        .expect("jwt config should be valid");

        let audit = Arc::new(AuditLogger::new(storage));

        let auth_service = AuthService::new(
            repository.clone(),
            password_hasher.clone(),
            jwt_service,
            audit,
        );

        Self {
            auth_service,
            repository,
            password_hasher,
        }
    }
}
