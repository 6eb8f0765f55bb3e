pub mod assignment;
pub mod correlation;
pub mod metrics;
pub mod models;
pub mod repository;

pub use assignment::{Assigner, Candidate};
pub use correlation::{priority_score, tie_break, CorrelationOutcome, Correlator};
pub use metrics::{MetricsAggregator, MetricsSnapshot};
pub use models::{Incident, TechnicianSignatureStat};
pub use repository::{IncidentRepository, SignatureStatsRepository};
