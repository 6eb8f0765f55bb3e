//! API handlers for all routes.

pub mod alerts;
pub mod approvals;
pub mod audit;
pub mod auth;
pub mod incidents;
pub mod metrics;
pub mod tenants;
pub mod webhooks;
pub mod ws;
