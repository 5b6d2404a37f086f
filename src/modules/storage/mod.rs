//! Storage module for raw and processed videos
//!
//! Provides an S3-compatible client that moves videos between the two
//! buckets and the local staging directories.

mod s3_client;

pub use s3_client::S3VideoStore;

use async_trait::async_trait;
use std::path::Path;

use crate::core::error::Result;

/// Remote storage for raw uploads and published videos
#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Download an object from the raw bucket into `destination`
    async fn download_raw(&self, object_name: &str, destination: &Path) -> Result<()>;

    /// Upload `source` to the processed bucket under `object_name`
    async fn upload_processed(&self, source: &Path, object_name: &str) -> Result<()>;

    /// Grant anonymous read access to an object in the processed bucket
    async fn make_public(&self, object_name: &str) -> Result<()>;

    /// Direct URL of an object in the processed bucket
    fn public_url(&self, object_name: &str) -> String;
}
