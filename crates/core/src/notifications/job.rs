//! Notification jobs and the log of what happened to them.

use crate::constants::JOB_LOG_CAPACITY;
use chrono::{DateTime, Utc};
use patient_types::PhoneNumber;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct JobId(Uuid);

impl JobId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// One notification to deliver.
///
/// The contact is captured when the job is created; later edits to the patient record do not
/// change where an already-queued notification goes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationJob {
    pub id: JobId,
    pub target_contact: PhoneNumber,
    pub enqueued_at: DateTime<Utc>,
}

impl NotificationJob {
    pub fn new(target_contact: PhoneNumber) -> Self {
        Self {
            id: JobId::new(),
            target_contact,
            enqueued_at: Utc::now(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Pending,
    InProgress,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

/// What is known about a job right now.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct JobRecord {
    pub id: JobId,
    pub target_contact: String,
    pub state: JobState,
    pub attempts: u32,
    /// Result message of the latest attempt.
    pub message: Option<String>,
    pub enqueued_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Default)]
struct LogInner {
    records: HashMap<JobId, JobRecord>,
    order: VecDeque<JobId>,
}

/// Shared, bounded record of job outcomes.
///
/// This is the only place a delivery result ends up. Once more than `JOB_LOG_CAPACITY` jobs have
/// been seen, the oldest entries are dropped.
#[derive(Clone, Default)]
pub struct JobLog {
    inner: Arc<Mutex<LogInner>>,
}

impl std::fmt::Debug for JobLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobLog")
            .field("len", &self.lock().records.len())
            .finish()
    }
}

impl JobLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &JobId) -> Option<JobRecord> {
        self.lock().records.get(id).cloned()
    }

    /// Every retained record, oldest first.
    pub fn snapshot(&self) -> Vec<JobRecord> {
        let inner = self.lock();
        inner
            .order
            .iter()
            .filter_map(|id| inner.records.get(id).cloned())
            .collect()
    }

    pub fn count(&self, state: JobState) -> usize {
        self.lock()
            .records
            .values()
            .filter(|record| record.state == state)
            .count()
    }

    pub(crate) fn pending(&self, job: &NotificationJob) {
        let mut inner = self.lock();
        inner.records.insert(
            job.id,
            JobRecord {
                id: job.id,
                target_contact: job.target_contact.to_string(),
                state: JobState::Pending,
                attempts: 0,
                message: None,
                enqueued_at: job.enqueued_at,
                updated_at: Utc::now(),
            },
        );
        inner.order.push_back(job.id);

        while inner.order.len() > JOB_LOG_CAPACITY {
            if let Some(oldest) = inner.order.pop_front() {
                inner.records.remove(&oldest);
            }
        }
    }

    /// Removes a job that never made it onto the queue.
    pub(crate) fn discard(&self, id: &JobId) {
        let mut inner = self.lock();
        inner.records.remove(id);
        inner.order.retain(|queued| queued != id);
    }

    pub(crate) fn claim(&self, id: &JobId) {
        self.modify(id, |record| record.state = JobState::InProgress);
    }

    pub(crate) fn attempt_finished(&self, id: &JobId, message: String) {
        self.modify(id, |record| {
            record.attempts += 1;
            record.message = Some(message);
        });
    }

    pub(crate) fn finish(&self, id: &JobId, state: JobState) {
        self.modify(id, |record| record.state = state);
    }

    fn modify(&self, id: &JobId, apply: impl FnOnce(&mut JobRecord)) {
        if let Some(record) = self.lock().records.get_mut(id) {
            apply(record);
            record.updated_at = Utc::now();
        }
    }

    // A panic elsewhere cannot leave a record half-written, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, LogInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> NotificationJob {
        NotificationJob::new(PhoneNumber::new("+1234567890").unwrap())
    }

    #[test]
    fn test_log_tracks_state_transitions() {
        let log = JobLog::new();
        let job = job();

        log.pending(&job);
        assert_eq!(log.get(&job.id).unwrap().state, JobState::Pending);

        log.claim(&job.id);
        log.attempt_finished(&job.id, "sent".into());
        log.finish(&job.id, JobState::Succeeded);

        let record = log.get(&job.id).unwrap();
        assert_eq!(record.state, JobState::Succeeded);
        assert_eq!(record.attempts, 1);
        assert_eq!(record.message.as_deref(), Some("sent"));
        assert_eq!(record.target_contact, "+1234567890");
        assert!(record.state.is_terminal());
    }

    #[test]
    fn test_discard_removes_record() {
        let log = JobLog::new();
        let job = job();
        log.pending(&job);
        log.discard(&job.id);
        assert!(log.get(&job.id).is_none());
        assert!(log.snapshot().is_empty());
    }

    #[test]
    fn test_log_evicts_oldest_beyond_capacity() {
        let log = JobLog::new();
        let first = job();
        log.pending(&first);
        for _ in 0..JOB_LOG_CAPACITY {
            log.pending(&job());
        }

        assert!(log.get(&first.id).is_none());
        assert_eq!(log.snapshot().len(), JOB_LOG_CAPACITY);
    }
}
