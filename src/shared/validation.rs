use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

/// Longest object name accepted by the stored-video pipeline
pub const MAX_OBJECT_NAME_LENGTH: usize = 255;

lazy_static! {
    /// Regex for object names that are joined onto a staging directory
    /// Must start with an alphanumeric character; no path separators
    /// - Valid: "clip.mp4", "user-42_upload.mov", "a"
    /// - Invalid: "../etc/passwd", "dir/clip.mp4", ".hidden", "clip name.mp4"
    pub static ref OBJECT_NAME_REGEX: Regex = Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]*$").unwrap();
}

/// Validator hook for object names used as local file names
pub fn validate_object_name(name: &str) -> Result<(), ValidationError> {
    if name.len() > MAX_OBJECT_NAME_LENGTH {
        return Err(ValidationError::new("object_name_too_long")
            .with_message(format!("must be at most {} bytes", MAX_OBJECT_NAME_LENGTH).into()));
    }
    if !OBJECT_NAME_REGEX.is_match(name) {
        return Err(ValidationError::new("object_name")
            .with_message("must be a plain file name without path separators".into()));
    }
    Ok(())
}
