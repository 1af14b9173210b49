use std::env;
use std::str::FromStr;

pub enum EnvKey {
    ServerPort,
    QueueMaxDepth,
    RenderOutputDir,
    RenderCommand,
    RenderTimeoutSecs,
    AnalyticsDatabaseUrl,
    AnalyticsDataDir,
    TrustProxy,
}

impl EnvKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvKey::ServerPort => "APP_PORT",
            EnvKey::QueueMaxDepth => "QUEUE_MAX_DEPTH",
            EnvKey::RenderOutputDir => "RENDER_OUTPUT_DIR",
            EnvKey::RenderCommand => "RENDER_COMMAND",
            EnvKey::RenderTimeoutSecs => "RENDER_TIMEOUT_SECS",
            EnvKey::AnalyticsDatabaseUrl => "ANALYTICS_DATABASE_URL",
            EnvKey::AnalyticsDataDir => "ANALYTICS_DATA_DIR",
            EnvKey::TrustProxy => "TRUST_PROXY",
        }
    }
}

pub fn get(key: EnvKey) -> Result<String, env::VarError> {
    env::var(key.as_str())
}

/// Like [`get`], but treats an empty value the same as an unset one.
pub fn get_opt(key: EnvKey) -> Option<String> {
    env::var(key.as_str()).ok().filter(|v| !v.trim().is_empty())
}

pub fn get_or(key: EnvKey, default: &str) -> String {
    env::var(key.as_str()).unwrap_or_else(|_| default.to_string())
}

pub fn get_parsed<T: FromStr>(key: EnvKey, default: T) -> T {
    match get(key) {
        Ok(val) => val.parse::<T>().unwrap_or(default),
        Err(_) => default,
    }
}
