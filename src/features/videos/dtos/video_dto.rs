use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::shared::constants::PROCESSED_VIDEO_PREFIX;
use crate::shared::validation::{validate_object_name, MAX_OBJECT_NAME_LENGTH};

/// Request DTO for transcoding a local file into another local file
///
/// A field that is absent, `null` or empty counts as missing.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessVideoDto {
    /// Local path of the video to transcode
    #[schema(example = "/tmp/in.mp4")]
    pub input_file_path: Option<String>,
    /// Local path the transcoded video is written to
    #[schema(example = "/tmp/out.mp4")]
    pub output_file_path: Option<String>,
}

impl ProcessVideoDto {
    /// Both paths, or `None` when either is missing
    pub fn into_paths(self) -> Option<(PathBuf, PathBuf)> {
        let input = self.input_file_path.filter(|p| !p.is_empty())?;
        let output = self.output_file_path.filter(|p| !p.is_empty())?;
        Some((PathBuf::from(input), PathBuf::from(output)))
    }
}

/// Request DTO for running the full storage pipeline on a raw video
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_default_output_name"))]
pub struct ProcessStoredVideoDto {
    /// Object name in the raw videos bucket
    #[validate(
        required(message = "inputFileName is required"),
        custom(function = "validate_object_name")
    )]
    #[schema(example = "clip.mp4")]
    pub input_file_name: Option<String>,
    /// Object name in the processed videos bucket (defaults to `processed-<inputFileName>`)
    #[validate(custom(function = "validate_object_name"))]
    #[schema(example = "processed-clip.mp4")]
    pub output_file_name: Option<String>,
}

impl ProcessStoredVideoDto {
    /// Raw and processed object names; call after `validate()`
    pub fn into_names(self) -> Option<(String, String)> {
        let raw = self.input_file_name?;
        let processed = self
            .output_file_name
            .unwrap_or_else(|| format!("{}{}", PROCESSED_VIDEO_PREFIX, raw));
        Some((raw, processed))
    }
}

/// The derived `processed-<inputFileName>` must fit the object name limit too
fn validate_default_output_name(dto: &ProcessStoredVideoDto) -> Result<(), ValidationError> {
    match (&dto.input_file_name, &dto.output_file_name) {
        (Some(raw), None) if PROCESSED_VIDEO_PREFIX.len() + raw.len() > MAX_OBJECT_NAME_LENGTH => {
            Err(ValidationError::new("default_output_name_too_long").with_message(
                format!(
                    "inputFileName must be at most {} bytes when outputFileName is omitted",
                    MAX_OBJECT_NAME_LENGTH - PROCESSED_VIDEO_PREFIX.len()
                )
                .into(),
            ))
        }
        _ => Ok(()),
    }
}

/// Response DTO for a completed stored-video pipeline
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessStoredVideoResponseDto {
    /// Object name that was read from the raw videos bucket
    pub raw_video_name: String,
    /// Object name of the published video
    pub processed_video_name: String,
    /// Direct URL of the published video
    pub public_url: String,
}
