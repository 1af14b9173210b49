use crate::common::response::{ApiError, ApiSuccess, ErrorResponse};
use crate::middleware::client_ip::ClientIp;
use crate::modules::render::dto::*;
use crate::modules::render::queue::QueueError;
use crate::modules::render::service::RenderService;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use tokio_util::io::ReaderStream;
use tracing::{error, warn};

pub const DOWNLOAD_FILENAME: &str = "whatsapp-chat.mp4";

impl From<QueueError> for ApiError {
    fn from(e: QueueError) -> Self {
        let status = match e {
            QueueError::Validation => StatusCode::BAD_REQUEST,
            QueueError::Capacity => StatusCode::SERVICE_UNAVAILABLE,
            QueueError::NotFound | QueueError::ArtifactNotReady => StatusCode::NOT_FOUND,
            QueueError::IllegalTransition(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError(e.to_string(), status)
    }
}

/// Queue a chat video for rendering
#[utoipa::path(
    post,
    path = "/api/queue",
    request_body = RenderRequest,
    responses(
        (status = 200, description = "Job accepted", body = EnqueueResponse),
        (status = 400, description = "Missing script or participants, or unparseable body", body = ErrorResponse),
        (status = 503, description = "Queue is full", body = ErrorResponse)
    ),
    tag = "Render"
)]
pub async fn enqueue_render(
    State(state): State<AppState>,
    Extension(client): Extension<ClientIp>,
    payload: Result<Json<RenderRequest>, JsonRejection>,
) -> impl IntoResponse {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "Rejected malformed render request");
            return ApiError::bad_request(INVALID_BODY_MESSAGE).into_response();
        }
    };

    match RenderService::enqueue(state, req, client.0).await {
        Ok(res) => ApiSuccess(res, StatusCode::OK).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Poll a job's status and live queue position
#[utoipa::path(
    get,
    path = "/api/status/{id}",
    params(
        ("id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "Job status", body = JobStatusResponse),
        (status = 404, description = "Job not found", body = ErrorResponse)
    ),
    tag = "Render"
)]
pub async fn get_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match RenderService::status(state, &id).await {
        Ok(res) => ApiSuccess(res, StatusCode::OK).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Download the rendered video of a completed job
#[utoipa::path(
    get,
    path = "/api/download/{id}",
    params(
        ("id" = String, Path, description = "Job ID")
    ),
    responses(
        (status = 200, description = "MP4 stream"),
        (status = 404, description = "File not ready or not found", body = ErrorResponse)
    ),
    tag = "Render"
)]
pub async fn download_render(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    let path = match RenderService::artifact(state, &id).await {
        Ok(path) => path,
        Err(e) => return ApiError::from(e).into_response(),
    };

    // The body stream owns the handle, so it is closed however the transfer ends.
    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) => {
            error!(job_id = %id, path = %path.display(), error = %e, "Download error");
            return ApiError::from(QueueError::ArtifactNotReady).into_response();
        }
    };
    let content_length = file.metadata().await.ok().map(|meta| meta.len());

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "video/mp4")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", DOWNLOAD_FILENAME),
        );
    if let Some(len) = content_length {
        builder = builder.header(header::CONTENT_LENGTH, len);
    }

    let body = Body::from_stream(ReaderStream::new(file));
    builder
        .body(body)
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}
