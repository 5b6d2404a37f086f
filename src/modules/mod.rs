//! Infrastructure the video feature is built on

pub mod staging;
pub mod storage;
pub mod transcoder;
