//! # Configuration Management
//!
//! Hierarchical configuration, loaded in order of increasing precedence:
//!
//! 1. **Default configuration** (`config/default.toml`)
//! 2. **Environment-specific configuration** (e.g. `config/production.toml`)
//! 3. **Environment variables** (highest precedence, `_`-separated)
//!
//! ## Security Considerations
//!
//! - Sensitive values (JWT secret, per-tenant HMAC secrets) should be
//!   provided via environment variables, never committed to TOML files.
//! - `Config::load` fails fast on insecure production defaults.

use config::{ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// JWT token signing and expiry configuration
    pub jwt: JwtConfig,
    /// Password hashing parameters
    pub security: SecurityConfig,
    /// HTTP server and worker configuration
    pub server: ServerConfig,
    /// Platform-wide default rate limit, applied to a tenant without its
    /// own `RateLimitConfig`
    pub rate_limit: RateLimitDefaults,
    /// Platform-wide default correlation window, applied to a tenant
    /// without its own `CorrelationConfig`
    pub correlation: CorrelationDefaults,
    /// Application-level settings
    pub app: AppConfig,
    /// Prometheus metrics configuration
    pub metrics: MetricsConfig,
    /// Cross-Origin Resource Sharing (CORS) policy
    pub cors: CorsConfig,
}

/// JWT (JSON Web Token) configuration for access-token signing. Refresh
/// tokens are opaque and not governed by this signing key, but their
/// lifetime is still configured here for symmetry with access tokens.
#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key used to sign access tokens (HS512). Must be at least 32
    /// characters; provide via `JWT_SECRET` in production.
    pub secret: String,
    /// Access token lifetime in seconds. Default 1800 (30 minutes).
    pub access_token_expiry: i64,
    /// Refresh token lifetime in seconds. Default 604800 (7 days).
    pub refresh_token_expiry: i64,
}

/// Argon2id password hashing parameters.
#[derive(Debug, Deserialize, Clone)]
pub struct SecurityConfig {
    /// Memory cost in KiB. Production minimum 65536 (64 MB).
    pub argon2_memory_cost: u32,
    /// Time cost (iterations). Production minimum 3.
    pub argon2_time_cost: u32,
    /// Parallelism (threads).
    pub argon2_parallelism: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: usize,
    /// Total inbound request timeout in seconds (§5: 15s).
    pub request_timeout_seconds: u64,
    /// Per-storage-call timeout in seconds (§5: 5s).
    pub storage_call_timeout_seconds: u64,
    /// Graceful-shutdown drain budget in seconds (§5: 30s).
    pub shutdown_timeout_seconds: u64,
}

/// Platform default admitted when a tenant has not configured its own
/// `RateLimitConfig`.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct RateLimitDefaults {
    pub requests_per_minute: u32,
    pub burst_size: u32,
    pub enabled: bool,
}

/// Platform default admitted when a tenant has not configured its own
/// `CorrelationConfig`.
#[derive(Debug, Deserialize, Clone)]
pub struct CorrelationDefaults {
    pub time_window_seconds: i64,
    pub aggregation_key: String,
    pub auto_correlate: bool,
    /// Correlator sweep interval in seconds (§4.F: default 30s).
    pub sweep_interval_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub log_level: String,
    /// Base URL used in outbound notification links.
    pub base_url: String,
    /// SLA/escalation monitor scan interval in seconds (§4.J: default 300s).
    pub sla_scan_interval_seconds: u64,
    /// Hourly sweep interval for TTL reaping on backends without native
    /// TTL support, in seconds (§5: default 3600s).
    pub ttl_reaper_interval_seconds: u64,
    /// Per-tenant config cache TTL in seconds (§5: default 60s).
    pub tenant_config_cache_ttl_seconds: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
    pub path: String,
    pub namespace: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub expose_headers: Vec<String>,
    pub max_age: Option<u64>,
    pub allow_credentials: bool,
}

impl Config {
    /// Loads configuration from `config/default.toml`, an optional
    /// environment-specific overlay, then environment variables. Fails fast
    /// if critical values are missing or insecure.
    pub fn load() -> Result<Self, ConfigError> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let builder = config::Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            .add_source(Environment::with_prefix("").separator("_"));

        let config = builder.build()?;
        let mut loaded_config: Config = config.try_deserialize()?;

        loaded_config.validate(&environment)?;

        Ok(loaded_config)
    }

    fn validate(&mut self, environment: &str) -> Result<(), ConfigError> {
        if self.jwt.secret.len() < 32 {
            return Err(ConfigError::Message(format!(
                "JWT secret must be at least 32 characters long (current: {})",
                self.jwt.secret.len()
            )));
        }

        if environment == "production" {
            self.validate_production_security()?;
        }

        if self.jwt.access_token_expiry <= 0 || self.jwt.access_token_expiry > 86400 {
            return Err(ConfigError::Message(
                "access token expiry must be between 1 second and 24 hours".to_string(),
            ));
        }

        if self.jwt.refresh_token_expiry <= self.jwt.access_token_expiry {
            return Err(ConfigError::Message(
                "refresh token expiry must be longer than access token expiry".to_string(),
            ));
        }

        if self.rate_limit.burst_size < self.rate_limit.requests_per_minute {
            return Err(ConfigError::Message(
                "default burst_size must be >= requests_per_minute".to_string(),
            ));
        }

        if !(300..=900).contains(&self.correlation.time_window_seconds) {
            return Err(ConfigError::Message(
                "default correlation time_window_seconds must be between 300 and 900".to_string(),
            ));
        }

        Ok(())
    }

    /// Fail-fast check for insecure production defaults left unset.
    fn validate_production_security(&self) -> Result<(), ConfigError> {
        let error_indicators = [
            "ERROR_",
            "INSECURE_DEFAULT",
            "CHANGE_THIS",
            "NOT_SET",
            "CHECK_ENVIRONMENT",
            "PLACEHOLDER",
        ];

        for indicator in &error_indicators {
            if self.jwt.secret.contains(indicator) {
                return Err(ConfigError::Message(format!(
                    "production deployment detected insecure JWT secret; set JWT_SECRET. Current value contains: {}",
                    indicator
                )));
            }
        }

        for indicator in &error_indicators {
            if self.app.base_url.contains(indicator) {
                return Err(ConfigError::Message(format!(
                    "production deployment detected missing base URL; set BASE_URL. Current value contains: {}",
                    indicator
                )));
            }
        }

        if self.security.argon2_memory_cost < 65536 {
            return Err(ConfigError::Message(
                "production deployment requires Argon2 memory cost of at least 65536 (64 MB)"
                    .to_string(),
            ));
        }

        if self.security.argon2_time_cost < 3 {
            return Err(ConfigError::Message(
                "production deployment requires Argon2 time cost of at least 3".to_string(),
            ));
        }

        for origin in &self.cors.allowed_origins {
            for indicator in &error_indicators {
                if origin.contains(indicator) {
                    return Err(ConfigError::Message(format!(
                        "production deployment detected missing CORS origin; set FRONTEND_URL. Current value contains: {}",
                        indicator
                    )));
                }
            }

            if origin == "*" {
                return Err(ConfigError::Message(
                    "production deployment must not use wildcard (*) CORS origins".to_string(),
                ));
            }
        }

        Ok(())
    }
}
