use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use crate::core::error::{AppError, Result};

/// Admission control for transcoding jobs
///
/// At most `max_concurrent` jobs run at once. Up to `queue_capacity` more
/// may wait for a slot; anything beyond that is rejected immediately.
#[derive(Debug)]
pub struct JobLimiter {
    running: Arc<Semaphore>,
    admitted: Arc<AtomicUsize>,
    max_concurrent: usize,
    max_admitted: usize,
}

/// Held for the lifetime of a job; releases its slot on drop
#[derive(Debug)]
pub struct JobPermit {
    _permit: OwnedSemaphorePermit,
    _admission: Admission,
}

/// Counts a job from admission until it finishes or is abandoned in the queue
#[derive(Debug)]
struct Admission {
    admitted: Arc<AtomicUsize>,
}

impl Drop for Admission {
    fn drop(&mut self) {
        self.admitted.fetch_sub(1, Ordering::SeqCst);
    }
}

impl JobLimiter {
    pub fn new(max_concurrent: usize, queue_capacity: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            running: Arc::new(Semaphore::new(max_concurrent)),
            admitted: Arc::new(AtomicUsize::new(0)),
            max_concurrent,
            max_admitted: max_concurrent + queue_capacity,
        }
    }

    /// Wait for a running slot, or fail fast when the queue is full
    pub async fn acquire(&self) -> Result<JobPermit> {
        let max_admitted = self.max_admitted;
        self.admitted
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < max_admitted).then_some(n + 1)
            })
            .map_err(|admitted| {
                warn!(
                    "Rejecting job: {} admitted, limit {}",
                    admitted, max_admitted
                );
                AppError::ServiceUnavailable(
                    "Transcoder is at capacity, try again later".to_string(),
                )
            })?;
        let admission = Admission {
            admitted: self.admitted.clone(),
        };

        let permit = self
            .running
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AppError::Internal("Job limiter is closed".to_string()))?;
        debug!(
            "Job started, {} of {} slots in use",
            self.max_concurrent - self.running.available_permits(),
            self.max_concurrent
        );

        Ok(JobPermit {
            _permit: permit,
            _admission: admission,
        })
    }

    /// Jobs currently running or waiting
    pub fn admitted(&self) -> usize {
        self.admitted.load(Ordering::SeqCst)
    }
}
