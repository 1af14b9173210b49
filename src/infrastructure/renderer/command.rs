use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::{RenderEngine, RenderError};
use crate::modules::render::composition::CompositionDescriptor;

const STDERR_TAIL_BYTES: usize = 2048;

/// Drives an external render CLI, one child process per job.
///
/// The configured command is the program plus any leading arguments, e.g.
/// `npx remotion render src/index.js`. Composition id, output path and encoder
/// flags are appended per render.
#[derive(Debug, Clone)]
pub struct CommandRenderEngine {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandRenderEngine {
    pub fn new(command: Vec<String>) -> Result<Self, RenderError> {
        let mut parts = command.into_iter();
        let program = parts
            .next()
            .ok_or_else(|| RenderError::Unavailable("empty render command".to_string()))?;

        Ok(Self {
            program: PathBuf::from(program),
            args: parts.collect(),
        })
    }

    fn props_path(output: &Path) -> PathBuf {
        output.with_extension("props.json")
    }

    async fn run(
        &self,
        descriptor: &CompositionDescriptor,
        output: &Path,
        props: &Path,
    ) -> Result<(), RenderError> {
        let last_frame = descriptor.duration_in_frames.saturating_sub(1);

        let result = Command::new(&self.program)
            .args(&self.args)
            .arg(descriptor.composition_id)
            .arg(output)
            .arg(format!("--props={}", props.display()))
            .arg(format!("--codec={}", descriptor.codec))
            .arg(format!("--crf={}", descriptor.crf))
            .arg(format!("--frames=0-{}", last_frame))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(RenderError::Spawn)?;

        if !result.status.success() {
            return Err(RenderError::Failed {
                exit_code: result.status.code(),
                stderr: stderr_tail(&result.stderr),
            });
        }

        match tokio::fs::metadata(output).await {
            Ok(meta) if meta.is_file() => Ok(()),
            _ => Err(RenderError::MissingOutput(output.display().to_string())),
        }
    }
}

#[async_trait]
impl RenderEngine for CommandRenderEngine {
    async fn prepare(&self) -> Result<(), RenderError> {
        let status = Command::new(&self.program)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| {
                RenderError::Unavailable(format!("{}: {}", self.program.display(), e))
            })?;

        if !status.success() {
            return Err(RenderError::Unavailable(format!(
                "{} --version exited with {:?}",
                self.program.display(),
                status.code()
            )));
        }

        info!(program = %self.program.display(), "Rendering engine ready");
        Ok(())
    }

    async fn render(&self, descriptor: &CompositionDescriptor, output: &Path) -> Result<(), RenderError> {
        let props = Self::props_path(output);
        tokio::fs::write(&props, serde_json::to_vec(&descriptor.input_props)?).await?;
        debug!(props = %props.display(), "Wrote composition props");

        let result = self.run(descriptor, output, &props).await;

        if let Err(e) = tokio::fs::remove_file(&props).await {
            warn!(props = %props.display(), error = %e, "Failed to remove composition props");
        }

        result
    }
}

fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let trimmed = text.trim();
    if trimmed.len() <= STDERR_TAIL_BYTES {
        return trimmed.to_string();
    }
    let mut start = trimmed.len() - STDERR_TAIL_BYTES;
    while !trimmed.is_char_boundary(start) {
        start += 1;
    }
    trimmed[start..].to_string()
}
