/// Bucket that raw uploads land in
pub const DEFAULT_RAW_VIDEOS_BUCKET: &str = "ad-yt-raw-videos";

/// Bucket that processed videos are published to
pub const DEFAULT_PROCESSED_VIDEOS_BUCKET: &str = "ad-yt-processed-videos";

/// Local staging directory for downloaded raw videos
pub const DEFAULT_RAW_VIDEOS_DIR: &str = "./raw-videos";

/// Local staging directory for encoder output
pub const DEFAULT_PROCESSED_VIDEOS_DIR: &str = "./processed-videos";

/// Prefix given to processed videos when the caller names no output
pub const PROCESSED_VIDEO_PREFIX: &str = "processed-";

/// Content type of uploaded processed videos
pub const PROCESSED_VIDEO_CONTENT_TYPE: &str = "video/mp4";

// =============================================================================
// RESPONSE MESSAGES
// =============================================================================

pub const PROCESSING_SUCCESS_MESSAGE: &str = "Processing finished successfully";

pub const MISSING_FILE_PATHS_MESSAGE: &str = "Missing input or output file path";
