mod job_limiter;
mod video_service;

pub use job_limiter::JobLimiter;
pub use video_service::VideoService;
