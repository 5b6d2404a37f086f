use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::JobLimiter;
use crate::core::error::{AppError, Result};
use crate::features::videos::dtos::ProcessStoredVideoResponseDto;
use crate::modules::staging::StagingArea;
use crate::modules::storage::VideoStore;
use crate::modules::transcoder::VideoEncoder;

/// Service for video processing
///
/// Cheap to clone; every job runs on its own task holding a clone, so a
/// client that disconnects does not stop an encode that already started.
#[derive(Clone)]
pub struct VideoService {
    encoder: Arc<dyn VideoEncoder>,
    store: Arc<dyn VideoStore>,
    staging: StagingArea,
    limiter: Arc<JobLimiter>,
}

impl VideoService {
    pub fn new(
        encoder: Arc<dyn VideoEncoder>,
        store: Arc<dyn VideoStore>,
        staging: StagingArea,
        limiter: Arc<JobLimiter>,
    ) -> Self {
        Self {
            encoder,
            store,
            staging,
            limiter,
        }
    }

    /// Create the local staging directories
    pub async fn setup_directories(&self) -> Result<()> {
        self.staging.setup_directories().await.map_err(|e| {
            AppError::Internal(format!("Failed to create staging directories: {}", e))
        })
    }

    /// Transcode a local file into another local file
    pub async fn process_local_video(&self, input: PathBuf, output: PathBuf) -> Result<()> {
        info!(
            "Processing local video {} -> {}",
            input.display(),
            output.display()
        );
        let encoder = self.encoder.clone();
        self.run_admitted(async move {
            encoder
                .encode(&input, &output)
                .await
                .map_err(AppError::from)
        })
        .await
    }

    /// Download, transcode, publish, and clean up one stored video
    pub async fn process_stored_video(
        &self,
        raw_name: String,
        processed_name: String,
    ) -> Result<ProcessStoredVideoResponseDto> {
        info!("Processing stored video {} -> {}", raw_name, processed_name);
        let this = self.clone();
        self.run_admitted(async move {
            let outcome = this.run_pipeline(&raw_name, &processed_name).await;
            this.cleanup(&raw_name, &processed_name).await;

            outcome.map(|()| ProcessStoredVideoResponseDto {
                public_url: this.store.public_url(&processed_name),
                raw_video_name: raw_name,
                processed_video_name: processed_name,
            })
        })
        .await
    }

    /// Download a raw video into the raw staging directory
    pub async fn download_raw_video(&self, file_name: &str) -> Result<()> {
        let destination = self.staging.raw_path(file_name);
        self.store.download_raw(file_name, &destination).await
    }

    /// Encode a staged raw video into the processed staging directory
    pub async fn convert_video(&self, raw_name: &str, processed_name: &str) -> Result<()> {
        let input = self.staging.raw_path(raw_name);
        let output = self.staging.processed_path(processed_name);
        self.encoder.encode(&input, &output).await?;
        Ok(())
    }

    /// Upload a staged processed video and make it publicly readable
    ///
    /// When the visibility change fails the uploaded object stays in the
    /// bucket, private.
    pub async fn upload_processed_video(&self, file_name: &str) -> Result<()> {
        let source = self.staging.processed_path(file_name);
        self.store.upload_processed(&source, file_name).await?;
        self.store.make_public(file_name).await?;
        info!("{} uploaded and made public", file_name);
        Ok(())
    }

    pub async fn delete_raw_video(&self, file_name: &str) -> Result<()> {
        self.staging
            .delete_raw_video(file_name)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to delete raw video: {}", e)))
    }

    pub async fn delete_processed_video(&self, file_name: &str) -> Result<()> {
        self.staging
            .delete_processed_video(file_name)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to delete processed video: {}", e)))
    }

    async fn run_pipeline(&self, raw_name: &str, processed_name: &str) -> Result<()> {
        self.download_raw_video(raw_name).await?;
        self.convert_video(raw_name, processed_name).await?;
        self.upload_processed_video(processed_name).await
    }

    /// Remove both staged files; failures are logged, never returned
    async fn cleanup(&self, raw_name: &str, processed_name: &str) {
        let (raw, processed) = tokio::join!(
            self.delete_raw_video(raw_name),
            self.delete_processed_video(processed_name)
        );
        for result in [raw, processed] {
            if let Err(e) = result {
                warn!("Staging cleanup failed: {}", e);
            }
        }
    }

    /// Run `job` on its own task once the limiter admits it
    async fn run_admitted<F, T>(&self, job: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self.limiter.acquire().await?;
        let handle = tokio::spawn(async move {
            let _permit = permit;
            job.await
        });
        debug!("Job spawned, {} admitted", self.limiter.admitted());

        handle
            .await
            .map_err(|e| AppError::Internal(format!("Video processing task failed: {}", e)))?
    }
}
