use utoipa::{Modify, OpenApi};

use crate::features::videos::{dtos as videos_dtos, handlers as videos_handlers};
use crate::shared::types::ApiResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        videos_handlers::process_video,
        videos_handlers::process_stored_video,
    ),
    components(
        schemas(
            videos_dtos::ProcessVideoDto,
            videos_dtos::ProcessStoredVideoDto,
            videos_dtos::ProcessStoredVideoResponseDto,
            ApiResponse<videos_dtos::ProcessStoredVideoResponseDto>,
        )
    ),
    tags(
        (name = "videos", description = "Video transcoding and publishing"),
    ),
    info(
        title = "Video Processing Service API",
        version = "0.1.0",
        description = "Rescales videos with ffmpeg and publishes them to object storage",
    )
)]
pub struct ApiDoc;

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
