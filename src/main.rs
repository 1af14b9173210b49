use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;

use chat_render::app;
use chat_render::config::settings::AppConfig;
use chat_render::infrastructure::renderer::{CommandRenderEngine, RenderEngine};
use chat_render::modules::analytics::AnalyticsSink;
use chat_render::modules::render::queue::RenderQueue;
use chat_render::state::AppState;
use chat_render::workers::render_worker::RenderWorker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Starting server...");

    let config = AppConfig::new();

    tokio::fs::create_dir_all(&config.render_output_dir)
        .await
        .with_context(|| format!("creating {}", config.render_output_dir.display()))?;

    let engine = CommandRenderEngine::new(config.render_command.clone())?;
    engine
        .prepare()
        .await
        .context("rendering engine failed to initialize")?;

    let analytics = AnalyticsSink::from_config(&config).await;

    let (queue, signals) = RenderQueue::new(config.queue_max_depth);
    let worker = RenderWorker::new(
        queue.clone(),
        Arc::new(engine),
        analytics,
        config.render_output_dir.clone(),
        config.render_timeout,
    );
    tokio::spawn(worker.run(signals));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let state = AppState::new(config, queue);
    let app = app::create_app(state).await;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Queue server running on http://{}", addr);

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
