//! In-memory stand-ins for the storage and encoder seams

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

use crate::core::error::{AppError, Result};
use crate::features::videos::services::{JobLimiter, VideoService};
use crate::modules::staging::StagingArea;
use crate::modules::storage::VideoStore;
use crate::modules::transcoder::{TranscodeError, VideoEncoder};

pub const FAKE_PUBLIC_ENDPOINT: &str = "http://storage.test";

/// Object store backed by two in-memory buckets
#[derive(Default)]
pub struct FakeVideoStore {
    raw: Mutex<HashMap<String, Vec<u8>>>,
    processed: Mutex<HashMap<String, Vec<u8>>>,
    public: Mutex<HashSet<String>>,
    pub fail_make_public: AtomicBool,
    pub fail_upload: AtomicBool,
}

impl FakeVideoStore {
    pub fn with_raw(self, name: &str, content: &[u8]) -> Self {
        self.raw
            .lock()
            .unwrap()
            .insert(name.to_string(), content.to_vec());
        self
    }

    pub fn processed_object(&self, name: &str) -> Option<Vec<u8>> {
        self.processed.lock().unwrap().get(name).cloned()
    }

    pub fn is_public(&self, name: &str) -> bool {
        self.public.lock().unwrap().contains(name)
    }
}

#[async_trait]
impl VideoStore for FakeVideoStore {
    async fn download_raw(&self, object_name: &str, destination: &Path) -> Result<()> {
        let content = self
            .raw
            .lock()
            .unwrap()
            .get(object_name)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Raw video '{}' not found", object_name)))?;
        tokio::fs::write(destination, content)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))
    }

    async fn upload_processed(&self, source: &Path, object_name: &str) -> Result<()> {
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(AppError::ExternalServiceError("upload refused".to_string()));
        }
        let content = tokio::fs::read(source)
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?;
        self.processed
            .lock()
            .unwrap()
            .insert(object_name.to_string(), content);
        Ok(())
    }

    async fn make_public(&self, object_name: &str) -> Result<()> {
        if self.fail_make_public.load(Ordering::SeqCst) {
            return Err(AppError::ExternalServiceError("ACL refused".to_string()));
        }
        if !self.processed.lock().unwrap().contains_key(object_name) {
            return Err(AppError::NotFound(object_name.to_string()));
        }
        self.public.lock().unwrap().insert(object_name.to_string());
        Ok(())
    }

    fn public_url(&self, object_name: &str) -> String {
        format!("{}/ad-yt-processed-videos/{}", FAKE_PUBLIC_ENDPOINT, object_name)
    }
}

/// Encoder that copies its input, or fails with canned ffmpeg output
#[derive(Default)]
pub struct FakeEncoder {
    pub fail_with: Mutex<Option<String>>,
    calls: AtomicUsize,
    last_call: Mutex<Option<(PathBuf, PathBuf)>>,
}

impl FakeEncoder {
    pub fn failing(stderr: &str) -> Self {
        Self {
            fail_with: Mutex::new(Some(stderr.to_string())),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_call(&self) -> Option<(PathBuf, PathBuf)> {
        self.last_call.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideoEncoder for FakeEncoder {
    async fn encode(&self, input: &Path, output: &Path) -> std::result::Result<(), TranscodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_call.lock().unwrap() = Some((input.to_path_buf(), output.to_path_buf()));

        if let Some(stderr) = self.fail_with.lock().unwrap().clone() {
            return Err(TranscodeError::Failed { code: 1, stderr });
        }
        tokio::fs::copy(input, output)
            .await
            .map(|_| ())
            .map_err(|e| TranscodeError::Failed {
                code: 1,
                stderr: format!("{}: {}", input.display(), e),
            })
    }
}

/// A service wired to fakes, with its staging dirs inside a temp dir
pub struct TestContext {
    pub service: Arc<VideoService>,
    pub store: Arc<FakeVideoStore>,
    pub encoder: Arc<FakeEncoder>,
    pub limiter: Arc<JobLimiter>,
    pub staging: StagingArea,
    pub dir: TempDir,
}

pub async fn test_context(store: FakeVideoStore, encoder: FakeEncoder) -> TestContext {
    test_context_with_limiter(store, encoder, JobLimiter::new(2, 2)).await
}

pub async fn test_context_with_limiter(
    store: FakeVideoStore,
    encoder: FakeEncoder,
    limiter: JobLimiter,
) -> TestContext {
    let dir = TempDir::new().unwrap();
    let staging = StagingArea::new(
        dir.path().join("raw-videos"),
        dir.path().join("processed-videos"),
    );
    staging.setup_directories().await.unwrap();

    let store = Arc::new(store);
    let encoder = Arc::new(encoder);
    let limiter = Arc::new(limiter);
    let service = Arc::new(VideoService::new(
        encoder.clone(),
        store.clone(),
        staging.clone(),
        limiter.clone(),
    ));

    TestContext {
        service,
        store,
        encoder,
        limiter,
        staging,
        dir,
    }
}
