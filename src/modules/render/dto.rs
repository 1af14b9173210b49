use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use super::model::{JobStatus, RenderPayload, ScriptEntry};

pub const MISSING_FIELDS_MESSAGE: &str = "Missing script or participants";
pub const INVALID_BODY_MESSAGE: &str = "Invalid request body";

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    #[validate(required(message = "script is required"))]
    pub script: Option<Vec<ScriptEntry>>,
    #[validate(required(message = "participants is required"))]
    pub participants: Option<Vec<String>>,
    pub chat_name: Option<String>,
    pub resolution: Option<String>,
    pub quality: Option<String>,
    pub participant_colors: Option<HashMap<String, String>>,
}

impl RenderRequest {
    /// Returns `None` when a required field is absent.
    pub fn into_payload(self) -> Option<RenderPayload> {
        Some(RenderPayload {
            script: self.script?,
            participants: self.participants?,
            chat_name: self.chat_name,
            resolution: self.resolution,
            quality: self.quality,
            participant_colors: self.participant_colors.unwrap_or_default(),
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueResponse {
    pub success: bool,
    pub job_id: Uuid,
    /// Zero-based rank among waiting jobs at the moment of acceptance.
    pub position: usize,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct JobStatusResponse {
    pub id: Uuid,
    pub status: JobStatus,
    pub position: Option<usize>,
    pub error: Option<String>,
}
