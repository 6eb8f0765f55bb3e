pub mod audit;
pub mod config;
pub mod error;
pub mod eventbus;
pub mod idempotency;
pub mod metrics;
pub mod ratelimit;
pub mod security;
pub mod storage;
pub mod tenant;
pub mod types;
pub mod utils;

pub use audit::AuditLogger;
pub use config::{Config, CorsConfig};
pub use error::{Error, ErrorCode, ErrorContext, Result};
pub use eventbus::{EventBus, Topic};
pub use idempotency::IdempotencyGuard;
pub use metrics::{MetricsRegistry, MetricsService};
pub use ratelimit::{RateLimitConfig, RateLimitDecision, RateLimiter};
pub use storage::{Filter, Sort, SortDirection, Storage};
pub use tenant::{
    AwsIntegration, CorrelationConfig, SlaConfig, Tenant, TenantRepository, WebhookSecurityConfig,
};
pub use types::*;

pub use chrono::{DateTime, Utc};
pub use uuid::Uuid;
