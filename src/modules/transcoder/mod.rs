//! Transcoder module
//!
//! Runs an external ffmpeg process to rescale videos. The encoder sits
//! behind the [`VideoEncoder`] trait so the pipeline can be exercised
//! without a real ffmpeg binary.

mod ffmpeg;

pub use ffmpeg::{FfmpegTranscoder, ScalePolicy};

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Errors signalled by the encoding process
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// The encoder binary could not be started (missing, not executable)
    #[error("Cannot run ffmpeg at '{path}': {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The encoder ran and exited with a non-zero status
    #[error("ffmpeg exited with code {code}: {stderr}")]
    Failed { code: i32, stderr: String },

    /// The encoder was killed before it could exit
    #[error("ffmpeg was terminated by a signal: {stderr}")]
    Terminated { stderr: String },
}

/// Something that can rescale a local video file into another local file
#[async_trait]
pub trait VideoEncoder: Send + Sync {
    /// Encode `input` into `output`, resolving once the output is complete
    async fn encode(&self, input: &Path, output: &Path) -> Result<(), TranscodeError>;
}
