pub mod analytics;
pub mod db;
pub mod renderer;
