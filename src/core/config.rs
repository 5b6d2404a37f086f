use std::env;
use std::path::PathBuf;

use crate::shared::constants::{
    DEFAULT_PROCESSED_VIDEOS_BUCKET, DEFAULT_PROCESSED_VIDEOS_DIR, DEFAULT_RAW_VIDEOS_BUCKET,
    DEFAULT_RAW_VIDEOS_DIR,
};

#[derive(Debug, Clone)]
pub struct Config {
    pub app: AppConfig,
    pub storage: StorageConfig,
    pub staging: StagingConfig,
    pub transcoder: TranscoderConfig,
    pub swagger: SwaggerConfig,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub cors_allowed_origins: Vec<String>,
    pub max_request_body_size: usize,
}

/// S3-compatible object storage holding the raw and processed video buckets
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage endpoint URL (MinIO, S3, or any S3-compatible service)
    pub endpoint: String,
    /// Endpoint used to build public object URLs (defaults to endpoint)
    pub public_endpoint: String,
    pub access_key: String,
    pub secret_key: String,
    pub region: String,
    /// Bucket that raw uploads are downloaded from
    pub raw_bucket: String,
    /// Bucket that processed videos are published to
    pub processed_bucket: String,
}

/// Local directories that hold files between transfer and encoding
#[derive(Debug, Clone)]
pub struct StagingConfig {
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct TranscoderConfig {
    /// Path or name of the ffmpeg binary
    pub ffmpeg_path: String,
    /// Output height in pixels; width follows the source aspect ratio
    pub target_height: u32,
    /// Encodes allowed to run at the same time
    pub max_concurrent_jobs: usize,
    /// Jobs allowed to wait for a free slot before new ones are rejected
    pub queue_capacity: usize,
}

#[derive(Debug, Clone)]
pub struct SwaggerConfig {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if exists, ignore if not found (optional for production)
        if let Err(e) = dotenvy::dotenv() {
            if !e.to_string().contains("not found") {
                eprintln!("Warning: Error loading .env file: {}", e);
            }
        }

        Ok(Config {
            app: AppConfig::from_env()?,
            storage: StorageConfig::from_env()?,
            staging: StagingConfig::from_env()?,
            transcoder: TranscoderConfig::from_env()?,
            swagger: SwaggerConfig::from_env()?,
        })
    }
}

impl AppConfig {
    // Request bodies are small JSON documents naming files, never the video itself
    const DEFAULT_MAX_REQUEST_BODY_SIZE: usize = 64 * 1024;

    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("Invalid PORT: {}", e))?;

        // Parse CORS allowed origins from comma-separated string
        let cors_allowed_origins = env::var("CORS_ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_request_body_size = env::var("MAX_REQUEST_BODY_SIZE")
            .unwrap_or_else(|_| Self::DEFAULT_MAX_REQUEST_BODY_SIZE.to_string())
            .parse::<usize>()
            .map_err(|_| "MAX_REQUEST_BODY_SIZE must be a valid number".to_string())?;

        Ok(Self {
            host,
            port,
            cors_allowed_origins,
            max_request_body_size,
        })
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl StorageConfig {
    pub fn from_env() -> Result<Self, String> {
        let endpoint =
            env::var("STORAGE_ENDPOINT").unwrap_or_else(|_| "http://localhost:9000".to_string());

        // Public endpoint defaults to the main endpoint if not specified
        let public_endpoint =
            env::var("STORAGE_PUBLIC_ENDPOINT").unwrap_or_else(|_| endpoint.clone());

        let access_key =
            env::var("STORAGE_ACCESS_KEY").unwrap_or_else(|_| "minioadmin".to_string());

        let secret_key =
            env::var("STORAGE_SECRET_KEY").unwrap_or_else(|_| "minioadmin".to_string());

        let region = env::var("STORAGE_REGION").unwrap_or_else(|_| "us-east-1".to_string());

        let raw_bucket = env::var("RAW_VIDEOS_BUCKET")
            .unwrap_or_else(|_| DEFAULT_RAW_VIDEOS_BUCKET.to_string());

        let processed_bucket = env::var("PROCESSED_VIDEOS_BUCKET")
            .unwrap_or_else(|_| DEFAULT_PROCESSED_VIDEOS_BUCKET.to_string());

        if raw_bucket == processed_bucket {
            return Err(
                "RAW_VIDEOS_BUCKET and PROCESSED_VIDEOS_BUCKET must be different buckets"
                    .to_string(),
            );
        }

        Ok(Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            public_endpoint: public_endpoint.trim_end_matches('/').to_string(),
            access_key,
            secret_key,
            region,
            raw_bucket,
            processed_bucket,
        })
    }
}

impl StagingConfig {
    pub fn from_env() -> Result<Self, String> {
        let raw_dir =
            env::var("RAW_VIDEOS_DIR").unwrap_or_else(|_| DEFAULT_RAW_VIDEOS_DIR.to_string());
        let processed_dir = env::var("PROCESSED_VIDEOS_DIR")
            .unwrap_or_else(|_| DEFAULT_PROCESSED_VIDEOS_DIR.to_string());

        if raw_dir == processed_dir {
            return Err(
                "RAW_VIDEOS_DIR and PROCESSED_VIDEOS_DIR must be different directories".to_string(),
            );
        }

        Ok(Self {
            raw_dir: PathBuf::from(raw_dir),
            processed_dir: PathBuf::from(processed_dir),
        })
    }
}

impl TranscoderConfig {
    const DEFAULT_TARGET_HEIGHT: u32 = 360;
    const DEFAULT_QUEUE_CAPACITY: usize = 16;

    pub fn from_env() -> Result<Self, String> {
        let ffmpeg_path = env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string());

        let target_height = env::var("TRANSCODE_TARGET_HEIGHT")
            .unwrap_or_else(|_| Self::DEFAULT_TARGET_HEIGHT.to_string())
            .parse::<u32>()
            .map_err(|_| "TRANSCODE_TARGET_HEIGHT must be a valid number".to_string())?;
        Self::validate_target_height(target_height)?;

        let default_concurrency = std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(2);

        let max_concurrent_jobs = env::var("MAX_CONCURRENT_JOBS")
            .unwrap_or_else(|_| default_concurrency.to_string())
            .parse::<usize>()
            .map_err(|_| "MAX_CONCURRENT_JOBS must be a valid number".to_string())?;
        if max_concurrent_jobs == 0 {
            return Err("MAX_CONCURRENT_JOBS must be at least 1".to_string());
        }

        let queue_capacity = env::var("JOB_QUEUE_CAPACITY")
            .unwrap_or_else(|_| Self::DEFAULT_QUEUE_CAPACITY.to_string())
            .parse::<usize>()
            .map_err(|_| "JOB_QUEUE_CAPACITY must be a valid number".to_string())?;

        Ok(Self {
            ffmpeg_path,
            target_height,
            max_concurrent_jobs,
            queue_capacity,
        })
    }

    /// H.264 with 4:2:0 chroma needs even dimensions
    pub fn validate_target_height(height: u32) -> Result<(), String> {
        if height == 0 || height % 2 != 0 {
            return Err(format!(
                "TRANSCODE_TARGET_HEIGHT must be a positive even number, got {}",
                height
            ));
        }
        Ok(())
    }
}

impl SwaggerConfig {
    pub fn from_env() -> Result<Self, String> {
        let title =
            env::var("SWAGGER_TITLE").unwrap_or_else(|_| "Video Processing Service".to_string());
        let version = env::var("SWAGGER_VERSION").unwrap_or_else(|_| "0.1.0".to_string());
        let description = env::var("SWAGGER_DESCRIPTION")
            .unwrap_or_else(|_| "Rescales raw videos with ffmpeg and publishes them".to_string());

        Ok(Self {
            title,
            version,
            description,
        })
    }
}
