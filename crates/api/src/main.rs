//! # Sentry API server
//!
//! HTTP entrypoint for the alert-management platform, built with Axum.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐    ┌──────────────┐    ┌─────────────────┐
//! │  Webhook /   │    │ API Server   │    │ Domain Crates   │
//! │  Dashboard   │────│              │────│                 │
//! │  Client      │    │ - Axum HTTP  │    │ - sentry-ingest │
//! │              │    │ - Middleware │    │ - sentry-incid. │
//! │              │    │ - WebSocket  │    │ - sentry-remed. │
//! └─────────────┘    └──────────────┘    └─────────────────┘
//! ```
//!
//! ## Middleware Stack
//!
//! 1. **Security Headers**: HSTS, CSP, X-Frame-Options
//! 2. **Request ID**: Unique tracking for request tracing
//! 3. **Authentication**: JWT verification (authenticated route groups only)
//! 4. **Tracing**: Structured logging with correlation IDs
//! 5. **Compression**: Gzip/Brotli response compression
//! 6. **CORS**: Cross-origin resource sharing policies

use axum::{http::StatusCode, middleware, response::IntoResponse, Json, Router};
use sentry_auth::{AuthRepository, AuthService};
use sentry_core::security::{JwtService, PasswordHasher};
use sentry_core::storage::{FieldFilter, InMemoryStorage, Storage};
use sentry_core::{AuditLogger, Config, EventBus, IdempotencyGuard, RateLimiter, TenantRepository};
use sentry_incidents::{Assigner, Correlator, IncidentRepository, MetricsAggregator, SignatureStatsRepository};
use sentry_ingest::{AlertRepository, AssetRepository, IngestService};
use sentry_remediation::{
    ApprovalRepository, ApprovalWorkflow, Dispatcher, NotificationService,
    RemediationExecutionRepository, RunbookRepository, SlaMonitor,
};
use std::{net::SocketAddr, sync::Arc};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use axum::http::{HeaderName, HeaderValue, Method};
use tracing::{error, info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod api_middleware;
mod authz;
mod collaborators;
mod error;
mod handlers;
mod health;
mod poller;
mod state;
#[cfg(test)]
mod test_support;

use crate::{
    collaborators::NoopExecutor,
    handlers::{alerts, approvals, audit, auth, incidents, metrics, tenants, webhooks, ws},
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    info!("starting sentry API server");

    let config = Config::load()?;
    validate_configuration(&config)?;
    info!("configuration loaded and validated");

    let state = bootstrap(config).await?;
    spawn_background_workers(state.clone());

    let app = create_app(state.clone())?;

    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.server.port));
    info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shutdown complete");
    Ok(())
}

/// Wires every repository and service against a single in-memory storage
/// backend (the resolved Open Question: no external database dependency
/// is part of this platform's contract, per DESIGN.md).
async fn bootstrap(config: Config) -> Result<AppState, Box<dyn std::error::Error>> {
    let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());

    let jwt_service = JwtService::new(&config.jwt)?;
    let jwt = Arc::new(jwt_service.clone());
    let password_hasher = PasswordHasher::new(&config.security)?;
    let audit = Arc::new(AuditLogger::new(storage.clone()));
    let event_bus = Arc::new(EventBus::new());

    let auth_repository = AuthRepository::new(storage.clone());
    let tenants = TenantRepository::new(storage.clone());
    let assets = AssetRepository::new(storage.clone());
    let alerts_repo = AlertRepository::new(storage.clone());
    let incidents_repo = IncidentRepository::new(storage.clone());
    let runbooks = RunbookRepository::new(storage.clone());
    let approvals = ApprovalRepository::new(storage.clone());
    let executions = RemediationExecutionRepository::new(storage.clone());
    let signature_stats = SignatureStatsRepository::new(storage.clone());

    let auth_service = Arc::new(AuthService::new(
        auth_repository.clone(),
        password_hasher,
        jwt_service,
        audit.clone(),
    ));

    let rate_limiter = RateLimiter::new(storage.clone());
    let idempotency = IdempotencyGuard::new(storage.clone());
    let ingest_service = Arc::new(IngestService::new(
        tenants.clone(),
        assets.clone(),
        alerts_repo.clone(),
        rate_limiter,
        idempotency,
        event_bus.clone(),
        audit.clone(),
    ));

    let correlator = Arc::new(Correlator::new(
        incidents_repo.clone(),
        alerts_repo.clone(),
        event_bus.clone(),
        audit.clone(),
    ));
    let assigner = Arc::new(Assigner::new(
        incidents_repo.clone(),
        auth_repository.clone(),
        signature_stats.clone(),
        event_bus.clone(),
        audit.clone(),
    ));
    let metrics_aggregator = Arc::new(MetricsAggregator::new(
        incidents_repo.clone(),
        alerts_repo.clone(),
    ));

    let notifications = NotificationService::new(storage.clone(), auth_repository.clone(), None);
    let dispatcher = Arc::new(Dispatcher::new(
        runbooks.clone(),
        approvals.clone(),
        executions.clone(),
        incidents_repo.clone(),
        signature_stats.clone(),
        notifications.clone(),
        Arc::new(NoopExecutor),
        event_bus.clone(),
        audit.clone(),
    ));
    let approval_workflow = Arc::new(ApprovalWorkflow::new(
        approvals.clone(),
        incidents_repo.clone(),
        notifications.clone(),
        audit.clone(),
    ));
    let sla_monitor = Arc::new(SlaMonitor::new(
        incidents_repo.clone(),
        notifications.clone(),
        audit.clone(),
    ));

    Ok(AppState {
        config,
        storage,
        event_bus,
        audit,
        jwt,
        auth_service,
        auth_repository,
        tenants,
        ingest_service,
        assets,
        alerts: alerts_repo,
        incidents: incidents_repo,
        correlator,
        assigner,
        metrics_aggregator,
        runbooks,
        approvals,
        executions,
        notifications,
        dispatcher,
        approval_workflow,
        sla_monitor,
    })
}

/// Lists every tenant id currently known to storage. Every tenant-scoped
/// background sweep (correlation, SLA escalation) runs this first since
/// none of `Correlator`/`SlaMonitor` iterate tenants themselves.
async fn list_tenant_ids(state: &AppState) -> Vec<sentry_core::TenantId> {
    match state.storage.find("tenants", &[], None, None).await {
        Ok(docs) => docs
            .into_iter()
            .filter_map(|doc| serde_json::from_value::<sentry_core::Tenant>(doc).ok())
            .map(|tenant| tenant.id)
            .collect(),
        Err(e) => {
            error!("failed to list tenants for background sweep: {}", e);
            Vec::new()
        }
    }
}

fn spawn_background_workers(state: AppState) {
    spawn_correlation_sweep(state.clone());
    spawn_sla_scan(state.clone());
    spawn_refresh_token_reaper(state);
}

/// §4.F: periodically re-runs correlation for every tenant with
/// `auto_correlate` enabled, picking up alerts that arrived between
/// webhook-triggered passes.
fn spawn_correlation_sweep(state: AppState) {
    let interval = std::time::Duration::from_secs(state.config.correlation.sweep_interval_seconds as u64);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let now = chrono::Utc::now().timestamp();
            for tenant_id in list_tenant_ids(&state).await {
                let Ok(Some(tenant)) = state.tenants.get_by_id(tenant_id).await else {
                    continue;
                };
                if !tenant.correlation.auto_correlate {
                    continue;
                }
                if let Err(e) = state
                    .correlator
                    .run(tenant_id, &tenant.correlation, &tenant.critical_assets, now)
                    .await
                {
                    warn!(%tenant_id, "correlation sweep failed: {}", e);
                }
            }
        }
    });
}

/// §4.J: advances every open, SLA-breached incident one escalation rung.
fn spawn_sla_scan(state: AppState) {
    let interval = std::time::Duration::from_secs(state.config.app.sla_scan_interval_seconds as u64);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let now = chrono::Utc::now().timestamp();
            for tenant_id in list_tenant_ids(&state).await {
                if let Err(e) = state.sla_monitor.scan(tenant_id, 0, now).await {
                    warn!(%tenant_id, "SLA scan failed: {}", e);
                }
            }
        }
    });
}

/// Reaps expired or revoked refresh tokens on an interval so a stale
/// session's token row doesn't live forever in storage. `AuthRepository`
/// exposes no bulk query for this, so it goes through the storage facade
/// directly, the same pattern every list handler uses.
fn spawn_refresh_token_reaper(state: AppState) {
    let interval = std::time::Duration::from_secs(state.config.app.ttl_reaper_interval_seconds as u64);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let now = chrono::Utc::now().timestamp();
            let docs = match state.storage.find("refresh_tokens", &[], None, None).await {
                Ok(docs) => docs,
                Err(e) => {
                    warn!("refresh token reaper failed to list tokens: {}", e);
                    continue;
                }
            };
            for doc in docs {
                let Ok(token) = serde_json::from_value::<sentry_auth::RefreshToken>(doc) else {
                    continue;
                };
                if token.revoked || token.expires_at <= now {
                    let _ = state
                        .storage
                        .delete_one("refresh_tokens", &[FieldFilter::eq("id", token.id.0.to_string())])
                        .await;
                }
            }
        }
    });
}

fn create_app(state: AppState) -> Result<Router, Box<dyn std::error::Error>> {
    #[derive(OpenApi)]
    #[openapi(
        paths(health::health_check, health::readiness_check),
        components(schemas()),
        tags(
            (name = "health", description = "Health check endpoints"),
            (name = "auth", description = "Authentication and session management"),
            (name = "tenants", description = "Tenant administration"),
            (name = "alerts", description = "Ingested alert listing"),
            (name = "incidents", description = "Incident lifecycle and remediation"),
            (name = "approval-requests", description = "Remediation approval workflow"),
            (name = "audit-logs", description = "Audit trail"),
            (name = "metrics", description = "KPI snapshots"),
        )
    )]
    struct ApiDoc;

    let protected = Router::new()
        .nest("/tenants", tenants::tenant_routes())
        .nest("/alerts", alerts::alert_routes())
        .nest("/incidents", incidents::incident_routes())
        .nest("/approval-requests", approvals::approval_routes())
        .nest("/audit-logs", audit::audit_routes())
        .nest("/metrics", metrics::metrics_routes())
        .nest("/ws", ws::ws_routes())
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            api_middleware::auth_middleware,
        ));

    let api_routes = Router::new()
        .nest("/webhooks", webhooks::webhook_routes())
        .nest("/auth", auth::auth_routes(state.clone()))
        .merge(protected);

    let router = Router::new()
        .nest("/api", api_routes)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", axum::routing::get(health::health_check))
        .route("/ready", axum::routing::get(health::readiness_check))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(
                    api_middleware::security_headers::security_headers_middleware,
                ))
                .layer(axum::middleware::from_fn(
                    api_middleware::request_id::request_id_middleware,
                ))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                        .on_request(DefaultOnRequest::new().level(Level::INFO))
                        .on_response(DefaultOnResponse::new().level(Level::INFO)),
                )
                .layer(CompressionLayer::new())
                .layer(build_cors_layer(&state.config.cors)?),
        )
        .with_state(state)
        .fallback(handler_404);

    Ok(router)
}

async fn handler_404() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "error": "resource not found" })),
    )
}

/// Builds a CORS layer from configuration. Production should never carry a
/// wildcard origin; `validate_configuration` enforces that separately.
fn build_cors_layer(cors_config: &sentry_core::config::CorsConfig) -> Result<CorsLayer, Box<dyn std::error::Error>> {
    let mut cors = CorsLayer::new();

    if cors_config.allowed_origins.contains(&"*".to_string()) {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Result<Vec<HeaderValue>, _> =
            cors_config.allowed_origins.iter().map(|origin| origin.parse()).collect();
        cors = cors.allow_origin(origins?);
    }

    if cors_config.allowed_methods.contains(&"*".to_string()) {
        cors = cors.allow_methods(Any);
    } else {
        let methods: Result<Vec<Method>, _> =
            cors_config.allowed_methods.iter().map(|method| method.parse()).collect();
        cors = cors.allow_methods(methods?);
    }

    if cors_config.allowed_headers.contains(&"*".to_string()) {
        cors = cors.allow_headers(Any);
    } else {
        let headers: Result<Vec<HeaderName>, _> =
            cors_config.allowed_headers.iter().map(|header| header.parse()).collect();
        cors = cors.allow_headers(headers?);
    }

    if !cors_config.expose_headers.is_empty() {
        let expose_headers: Result<Vec<HeaderName>, _> =
            cors_config.expose_headers.iter().map(|header| header.parse()).collect();
        cors = cors.expose_headers(expose_headers?);
    }

    cors = cors.allow_credentials(cors_config.allow_credentials);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "sentry_api=debug,sentry_auth=debug,sentry_core=debug,sentry_ingest=debug,sentry_incidents=debug,sentry_remediation=debug,tower_http=debug"
                .into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Fail-fast checks against insecure defaults, trimmed to what this
/// platform actually depends on: there is no database or cache password to
/// validate, so only the JWT secret and production CORS policy are
/// checked (documented in DESIGN.md).
fn validate_configuration(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    const DEFAULT_SECRETS: &[&str] = &[
        "your-super-secret-jwt-key-change-in-production-min-32-chars",
        "change_me_in_production",
        "placeholder",
        "default",
        "secret",
    ];

    let mut errors = Vec::new();
    let is_production = config.app.environment == "production";

    if config.jwt.secret.len() < 32 {
        errors.push("JWT secret must be at least 32 characters long".to_string());
    }
    if DEFAULT_SECRETS.iter().any(|&s| config.jwt.secret.contains(s)) {
        errors.push("JWT secret contains a default/insecure value".to_string());
    }

    if is_production {
        if config.cors.allowed_origins.contains(&"*".to_string()) {
            errors.push("CORS allowed origins contains a wildcard (*) in production".to_string());
        }
        if config.jwt.access_token_expiry > 3600 {
            errors.push("JWT access token expiry is too long for production (should be <= 1 hour)".to_string());
        }
    }

    if !errors.is_empty() {
        for e in &errors {
            error!("configuration security issue: {}", e);
        }
        if is_production {
            return Err("configuration validation failed: security issues detected".into());
        }
        warn!("running with insecure configuration outside production; fix before deploying");
    }

    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C signal"),
        _ = terminate => info!("received terminate signal"),
    }
}
