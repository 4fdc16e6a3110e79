//! Asynchronous patient notifications.
//!
//! Record mutations hand a [`NotificationJob`] to a [`NotificationQueue`] and move on. What
//! happens to the job afterwards (delivery, failure, retries) is invisible to the caller and
//! is only recorded in a [`JobLog`].
//!
//! Backends:
//! - [`WorkerQueue`] / [`Dispatcher`]: tokio worker pool delivering through a [`DeliveryChannel`]
//! - [`RecordingQueue`]: keeps jobs in memory without delivering them, for tests

mod channel;
mod dispatcher;
mod job;

pub use channel::{DeliveryChannel, SimulatedChannel};
pub use dispatcher::{Dispatcher, WorkerQueue};
pub use job::{JobId, JobLog, JobRecord, JobState, NotificationJob};

use crate::error::DispatchError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Accepts notification jobs without waiting for them to be delivered.
pub trait NotificationQueue: Send + Sync {
    /// Queues `job` and returns immediately.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Closed`] if the queue no longer accepts work.
    fn enqueue(&self, job: NotificationJob) -> Result<JobId, DispatchError>;
}

/// In-memory queue that only remembers what it was given.
#[derive(Default)]
pub struct RecordingQueue {
    jobs: Mutex<Vec<NotificationJob>>,
    closed: AtomicBool,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// A queue that rejects every job, as a shut-down dispatcher would.
    pub fn closed() -> Self {
        Self {
            jobs: Mutex::default(),
            closed: AtomicBool::new(true),
        }
    }

    pub fn jobs(&self) -> Vec<NotificationJob> {
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl NotificationQueue for RecordingQueue {
    fn enqueue(&self, job: NotificationJob) -> Result<JobId, DispatchError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DispatchError::Closed);
        }
        let id = job.id;
        self.jobs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(job);
        Ok(id)
    }
}
