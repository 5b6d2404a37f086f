use axum::{extract::State, Json};
use std::sync::Arc;
use tracing::debug;
use validator::Validate;

use crate::core::error::AppError;
use crate::core::extractor::{AppJson, AppJsonOrDefault};
use crate::features::videos::dtos::{
    ProcessStoredVideoDto, ProcessStoredVideoResponseDto, ProcessVideoDto,
};
use crate::features::videos::services::VideoService;
use crate::shared::constants::{MISSING_FILE_PATHS_MESSAGE, PROCESSING_SUCCESS_MESSAGE};
use crate::shared::types::ApiResponse;

/// Transcode a local video file
///
/// Blocks until the encoder finishes. Paths are resolved on the server's
/// filesystem.
#[utoipa::path(
    post,
    path = "/process-video",
    tag = "videos",
    request_body = ProcessVideoDto,
    responses(
        (status = 200, description = "Processing finished successfully", body = String, content_type = "text/plain"),
        (status = 400, description = "Missing input or output file path, or malformed JSON"),
        (status = 500, description = "Encoder failed; body carries its error text"),
        (status = 503, description = "Transcoder is at capacity")
    )
)]
pub async fn process_video(
    State(service): State<Arc<VideoService>>,
    AppJsonOrDefault(dto): AppJsonOrDefault<ProcessVideoDto>,
) -> Result<&'static str, AppError> {
    let (input, output) = dto.into_paths().ok_or_else(|| {
        debug!("Rejecting process-video request without both paths");
        AppError::BadRequest(MISSING_FILE_PATHS_MESSAGE.to_string())
    })?;

    service.process_local_video(input, output).await?;
    Ok(PROCESSING_SUCCESS_MESSAGE)
}

/// Process a video from the raw bucket and publish the result
///
/// Downloads `inputFileName`, transcodes it, uploads it to the processed
/// bucket under `outputFileName` and makes it publicly readable.
#[utoipa::path(
    post,
    path = "/process-stored-video",
    tag = "videos",
    request_body = ProcessStoredVideoDto,
    responses(
        (status = 200, description = "Video processed and published", body = ApiResponse<ProcessStoredVideoResponseDto>),
        (status = 400, description = "Invalid object name or malformed JSON"),
        (status = 404, description = "Raw video not found"),
        (status = 500, description = "Encoder failed"),
        (status = 502, description = "Object storage request failed"),
        (status = 503, description = "Transcoder is at capacity")
    )
)]
pub async fn process_stored_video(
    State(service): State<Arc<VideoService>>,
    AppJson(dto): AppJson<ProcessStoredVideoDto>,
) -> Result<Json<ApiResponse<ProcessStoredVideoResponseDto>>, AppError> {
    dto.validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let (raw_name, processed_name) = dto
        .into_names()
        .ok_or_else(|| AppError::BadRequest("inputFileName is required".to_string()))?;

    let response = service
        .process_stored_video(raw_name, processed_name)
        .await?;

    Ok(Json(ApiResponse::success(
        Some(response),
        Some(PROCESSING_SUCCESS_MESSAGE.to_string()),
    )))
}
