use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use crate::config::env::{self, EnvKey};

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_QUEUE_MAX_DEPTH: usize = 50;
pub const DEFAULT_RENDER_COMMAND: &str = "npx remotion render src/index.js";

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub server_port: u16,
    /// Submissions are refused once more than this many jobs are waiting.
    pub queue_max_depth: usize,
    pub render_output_dir: PathBuf,
    pub render_command: Vec<String>,
    pub render_timeout: Option<Duration>,
    pub analytics_database_url: Option<String>,
    pub analytics_data_dir: PathBuf,
    pub trust_proxy: bool,
}

impl AppConfig {
    pub fn new() -> Self {
        let render_command = env::get_or(EnvKey::RenderCommand, DEFAULT_RENDER_COMMAND)
            .split_whitespace()
            .map(str::to_string)
            .collect::<Vec<_>>();

        Self {
            server_port: env::get_parsed(EnvKey::ServerPort, DEFAULT_PORT),
            queue_max_depth: env::get_parsed(EnvKey::QueueMaxDepth, DEFAULT_QUEUE_MAX_DEPTH),
            render_output_dir: env::get_opt(EnvKey::RenderOutputDir)
                .map(PathBuf::from)
                .unwrap_or_else(default_output_dir),
            render_command,
            render_timeout: env::get_opt(EnvKey::RenderTimeoutSecs)
                .and_then(|v| v.parse::<u64>().ok())
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            analytics_database_url: env::get_opt(EnvKey::AnalyticsDatabaseUrl),
            analytics_data_dir: env::get_opt(EnvKey::AnalyticsDataDir)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data")),
            trust_proxy: env::get_parsed(EnvKey::TrustProxy, true),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_port: DEFAULT_PORT,
            queue_max_depth: DEFAULT_QUEUE_MAX_DEPTH,
            render_output_dir: default_output_dir(),
            render_command: DEFAULT_RENDER_COMMAND
                .split_whitespace()
                .map(str::to_string)
                .collect(),
            render_timeout: None,
            analytics_database_url: None,
            analytics_data_dir: PathBuf::from("data"),
            trust_proxy: true,
        }
    }
}

fn default_output_dir() -> PathBuf {
    std::env::temp_dir().join("whatsapp_simulator_exports")
}
