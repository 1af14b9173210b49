use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use crate::modules::render::composition::CompositionDescriptor;

pub mod command;

pub use command::CommandRenderEngine;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("renderer unavailable: {0}")]
    Unavailable(String),
    #[error("failed to spawn renderer: {0}")]
    Spawn(std::io::Error),
    #[error("renderer exited with code {exit_code:?}: {stderr}")]
    Failed {
        exit_code: Option<i32>,
        stderr: String,
    },
    #[error("renderer reported success but wrote no file at {0}")]
    MissingOutput(String),
    #[error("render timed out after {0:?}")]
    TimedOut(Duration),
    #[error("render task aborted: {0}")]
    Aborted(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode composition props: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// The video composition and encoding backend.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    /// Verifies the engine can run at all. Called once before serving.
    async fn prepare(&self) -> Result<(), RenderError>;

    /// Renders `descriptor` into a file at `output`.
    async fn render(&self, descriptor: &CompositionDescriptor, output: &Path) -> Result<(), RenderError>;
}
