use axum::{routing::post, Router};
use std::sync::Arc;

use crate::features::videos::handlers::{process_stored_video, process_video};
use crate::features::videos::services::VideoService;

/// Create routes for the videos feature
pub fn routes(video_service: Arc<VideoService>) -> Router {
    Router::new()
        .route("/process-video", post(process_video))
        .route("/process-stored-video", post(process_stored_video))
        .with_state(video_service)
}
