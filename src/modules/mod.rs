pub mod analytics;
pub mod render;
