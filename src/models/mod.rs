//! # Domain Models
//!
//! Managed orchestrator identities, their cached on-chain metrics and the
//! process-wide round snapshot.

pub mod metric;
pub mod orchestrator;
pub mod round;
pub mod units;

pub use metric::{CachedMetric, Freshness, Metric, MetricValue};
pub use orchestrator::{Credential, Orchestrator, OrchestratorIdentity, SigningKey};
pub use round::RoundSnapshot;
