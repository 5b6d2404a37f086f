use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use super::{TranscodeError, VideoEncoder};
use crate::core::config::TranscoderConfig;

/// Number of trailing stderr lines kept in error messages
const STDERR_TAIL_LINES: usize = 10;

/// Scaling applied to every encode
///
/// Output height is fixed; width follows the source aspect ratio and is
/// rounded to an even number so yuv420p encoders accept it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScalePolicy {
    pub target_height: u32,
}

impl ScalePolicy {
    pub fn new(target_height: u32) -> Self {
        Self { target_height }
    }

    /// The `-vf` argument for this policy
    pub fn video_filter(&self) -> String {
        format!("scale=-2:{}", self.target_height)
    }
}

/// Rescales videos by running the ffmpeg binary
pub struct FfmpegTranscoder {
    ffmpeg_path: String,
    policy: ScalePolicy,
}

impl FfmpegTranscoder {
    pub fn new(ffmpeg_path: impl Into<String>, policy: ScalePolicy) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            policy,
        }
    }

    pub fn from_config(config: &TranscoderConfig) -> Self {
        Self::new(
            config.ffmpeg_path.clone(),
            ScalePolicy::new(config.target_height),
        )
    }

    pub fn policy(&self) -> ScalePolicy {
        self.policy
    }

    /// Command-line arguments for encoding `input` into `output`
    pub fn build_args(&self, input: &Path, output: &Path) -> Vec<OsString> {
        vec![
            "-hide_banner".into(),
            // Overwrite the output like the staging flow expects
            "-y".into(),
            "-i".into(),
            input.as_os_str().to_owned(),
            "-vf".into(),
            self.policy.video_filter().into(),
            output.as_os_str().to_owned(),
        ]
    }
}

#[async_trait]
impl VideoEncoder for FfmpegTranscoder {
    #[tracing::instrument(skip(self), fields(filter = %self.policy.video_filter()))]
    async fn encode(&self, input: &Path, output: &Path) -> Result<(), TranscodeError> {
        let args = self.build_args(input, output);
        debug!("Executing {} {:?}", self.ffmpeg_path, args);

        let result = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|source| TranscodeError::Spawn {
                path: self.ffmpeg_path.clone(),
                source,
            })?;

        if result.status.success() {
            info!("Processing finished successfully");
            return Ok(());
        }

        let stderr = stderr_tail(&result.stderr, STDERR_TAIL_LINES);
        Err(match result.status.code() {
            Some(code) => TranscodeError::Failed { code, stderr },
            None => TranscodeError::Terminated { stderr },
        })
    }
}

/// Last `max_lines` non-empty lines of the encoder's stderr
///
/// Progress updates end in `\r` rather than `\n`, so both count as breaks.
fn stderr_tail(stderr: &[u8], max_lines: usize) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text
        .split(['\r', '\n'])
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .collect();
    let start = lines.len().saturating_sub(max_lines);
    lines[start..].join("\n")
}
