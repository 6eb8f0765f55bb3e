use sentry_core::storage::InMemoryStorage;
use sentry_core::{
    AggregationKeyKind, AuditLogger, CorrelationConfig, EventBus, IdempotencyGuard,
    RateLimitConfig, RateLimiter, SlaConfig, Storage, Tenant, TenantId, TenantRepository,
    TenantStatus, WebhookSecurityConfig,
};
use sentry_ingest::{AlertRepository, AssetRepository, IngestService};
use std::sync::Arc;

pub struct TestContext {
    pub service: IngestService,
    pub storage: Arc<dyn Storage>,
    pub tenants: TenantRepository,
}

impl TestContext {
    pub async fn new() -> Self {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        let tenants = TenantRepository::new(storage.clone());
        let assets = AssetRepository::new(storage.clone());
        let alerts = AlertRepository::new(storage.clone());
        let rate_limiter = RateLimiter::new(storage.clone());
        let idempotency = IdempotencyGuard::new(storage.clone());
        let event_bus = Arc::new(EventBus::new());
        let audit = Arc::new(AuditLogger::new(storage.clone()));

        let service = IngestService::new(
            tenants.clone(),
            assets,
            alerts,
            rate_limiter,
            idempotency,
            event_bus,
            audit,
        );

        Self {
            service,
            storage,
            tenants,
        }
    }

    pub async fn seed_tenant(&self, api_key: &str, hmac_enabled: bool, hmac_secret: &str) -> TenantId {
        let tenant = Tenant {
            id: TenantId::new(),
            name: "Acme MSP".to_string(),
            api_key: api_key.to_string(),
            hmac_secret: hmac_enabled.then(|| hmac_secret.to_string()),
            aws_integration: None,
            critical_assets: Default::default(),
            rate_limit: RateLimitConfig {
                requests_per_minute: 60,
                burst_size: 60,
                enabled: true,
            },
            correlation: CorrelationConfig {
                time_window_seconds: 300,
                aggregation_key: AggregationKeyKind::AssetSignature,
                auto_correlate: true,
            },
            webhook_security: WebhookSecurityConfig {
                hmac_enabled,
                secret: hmac_secret.to_string(),
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
        self.tenants.insert(&tenant).await.expect("tenant insert should succeed");
        tenant.id
    }
}
