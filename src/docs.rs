use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::modules::render::handler::enqueue_render,
        crate::modules::render::handler::get_status,
        crate::modules::render::handler::download_render,
    ),
    components(
        schemas(
            crate::modules::render::dto::RenderRequest,
            crate::modules::render::dto::EnqueueResponse,
            crate::modules::render::dto::JobStatusResponse,
            crate::modules::render::model::ScriptEntry,
            crate::modules::render::model::JobStatus,
            crate::common::response::ErrorResponse,
        )
    ),
    tags(
        (name = "Render", description = "Chat video render queue")
    )
)]
pub struct ApiDoc;
