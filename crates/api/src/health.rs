//! # Health Check Endpoints
//!
//! This module provides health monitoring endpoints for the alert platform's
//! API server. These endpoints are essential for:
//!
//! - **Load balancer health checks**: Determine if instances should receive traffic
//! - **Container orchestration**: Kubernetes liveness and readiness probes
//! - **Monitoring systems**: Automated alerting on service degradation
//! - **Deployment validation**: Ensure services start correctly
//!
//! ## Health Check Types
//!
//! ### Liveness Check (`/health`)
//! - **Purpose**: Indicates if the service is running and not deadlocked
//! - **Response**: Always returns 200 OK with basic service info
//! - **Use case**: Load balancer health checks, basic monitoring
//!
//! ### Readiness Check (`/ready`)
//! - **Purpose**: Indicates if the service can handle requests
//! - **Dependencies**: Confirms the storage facade answers a trivial query
//! - **Response**: 200 OK if ready, 503 Service Unavailable if not
//! - **Use case**: Kubernetes readiness probes, deployment validation
//!
//! ## Integration Examples
//!
//! ### Docker Health Check
//! ```dockerfile
//! HEALTHCHECK --interval=30s --timeout=3s --start-period=5s --retries=3 \
//!   CMD curl -f http://localhost:3000/health || exit 1
//! ```
//!
//! ### Kubernetes Probes
//! ```yaml
//! livenessProbe:
//!   httpGet:
//!     path: /health
//!     port: 3000
//!   initialDelaySeconds: 30
//!   periodSeconds: 10
//!
//! readinessProbe:
//!   httpGet:
//!     path: /ready
//!     port: 3000
//!   initialDelaySeconds: 5
//!   periodSeconds: 5
//! ```

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use sentry_core::storage::FieldFilter;
use serde_json::json;
use tracing::error;

use crate::state::AppState;

/// Basic health check endpoint for liveness monitoring.
///
/// This endpoint provides a simple health status response that indicates
/// the service is running and responsive. It does not check external
/// dependencies and should always return successfully unless the service
/// is completely non-functional.
///
/// # Response Format
///
/// ```json
/// {
///   "status": "healthy",
///   "service": "sentry-api",
///   "version": "0.1.0"
/// }
/// ```
///
/// # HTTP Status
///
/// - **200 OK**: Service is alive and responding
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = Object)
    ),
    tag = "health"
)]
pub async fn health_check() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "service": "sentry-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Readiness check: confirms the storage facade is answering queries.
///
/// Unlike the teacher's PostgreSQL/Redis readiness probe, this platform's
/// only hard dependency is the `Storage` trait object behind `AppState`;
/// a backend-agnostic `count` against a tenant-scoped collection is enough
/// to prove the facade is alive, whatever concrete backend it wraps.
///
/// # HTTP Status Codes
///
/// - **200 OK**: the storage facade answered
/// - **503 Service Unavailable**: the storage facade errored
#[utoipa::path(
    get,
    path = "/ready",
    responses(
        (status = 200, description = "Service is ready", body = Object),
        (status = 503, description = "Service is not ready", body = Object)
    ),
    tag = "health"
)]
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let storage_healthy = match state
        .storage
        .count("tenants", &[FieldFilter::eq("id", "__readiness_probe__")])
        .await
    {
        Ok(_) => true,
        Err(e) => {
            error!("storage health check failed: {}", e);
            false
        }
    };

    let status = if storage_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "ready": storage_healthy,
            "checks": {
                "storage": storage_healthy,
            }
        })),
    )
}
