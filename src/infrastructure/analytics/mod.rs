pub mod local;
pub mod postgres;

pub use local::LocalLogAnalytics;
pub use postgres::PostgresAnalytics;
