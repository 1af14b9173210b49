pub mod model;
pub mod service;

pub use model::AnalyticsRecord;
pub use service::{AnalyticsBackend, AnalyticsError, AnalyticsSink};
