use crate::config::settings::AppConfig;
use crate::modules::render::queue::RenderQueue;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub queue: RenderQueue,
}

impl AppState {
    pub fn new(config: AppConfig, queue: RenderQueue) -> Self {
        Self { config, queue }
    }
}
