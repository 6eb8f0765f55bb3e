pub mod models;
pub mod repository;
pub mod service;

pub use models::{Alert, Asset};
pub use repository::{AlertRepository, AssetRepository};
pub use service::{IngestRequest, IngestResponse, IngestService, WebhookHeaders};
