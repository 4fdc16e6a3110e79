//! Worker-pool notification dispatcher.
//!
//! Jobs go onto an unbounded tokio channel, so `enqueue` never waits. A fixed number of worker
//! tasks share the receiving end; whichever worker is free claims the next job and runs it to
//! completion, retries included.
//!
//! Job lifecycle as recorded in the [`JobLog`]:
//!
//! ```text
//! pending --claim--> in_progress --attempt ok--> succeeded
//!                        |  ^
//!                        |  | backoff, attempts left
//!                        v  |
//!                   attempt failed --no attempts left--> failed
//! ```

use super::channel::DeliveryChannel;
use super::job::{JobId, JobLog, JobState, NotificationJob};
use super::NotificationQueue;
use crate::config::{NotificationConfig, RetryPolicy};
use crate::error::{DeliveryFailure, DispatchError};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

/// Producer side of the dispatcher. Cheap to clone; all clones feed the same workers.
#[derive(Clone)]
pub struct WorkerQueue {
    sender: Arc<Mutex<Option<UnboundedSender<NotificationJob>>>>,
    log: JobLog,
}

impl WorkerQueue {
    pub fn log(&self) -> &JobLog {
        &self.log
    }

    fn close(&self) {
        self.sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl NotificationQueue for WorkerQueue {
    fn enqueue(&self, job: NotificationJob) -> Result<JobId, DispatchError> {
        let id = job.id;
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let sender = sender.as_ref().ok_or(DispatchError::Closed)?;

        self.log.pending(&job);
        if sender.send(job).is_err() {
            self.log.discard(&id);
            return Err(DispatchError::Closed);
        }
        Ok(id)
    }
}

#[derive(Clone)]
struct WorkerContext {
    channel: Arc<dyn DeliveryChannel>,
    retry: RetryPolicy,
    attempt_timeout: Option<Duration>,
    log: JobLog,
}

/// Owns the worker tasks. Keep it alive for as long as jobs should be processed.
pub struct Dispatcher {
    queue: WorkerQueue,
    workers: Vec<JoinHandle<()>>,
}

impl Dispatcher {
    /// Spawns `config.workers()` workers on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime, as `tokio::spawn` does.
    pub fn start(config: &NotificationConfig, channel: Arc<dyn DeliveryChannel>) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let log = JobLog::new();

        let context = WorkerContext {
            channel,
            retry: config.retry().clone(),
            attempt_timeout: config.attempt_timeout(),
            log: log.clone(),
        };

        let workers = (0..config.workers().max(1))
            .map(|worker| tokio::spawn(run_worker(worker, receiver.clone(), context.clone())))
            .collect();

        tracing::info!(
            "notification dispatcher started with {} workers",
            config.workers().max(1)
        );

        Self {
            queue: WorkerQueue {
                sender: Arc::new(Mutex::new(Some(sender))),
                log,
            },
            workers,
        }
    }

    /// Producer handle to pass to services.
    pub fn queue(&self) -> WorkerQueue {
        self.queue.clone()
    }

    pub fn log(&self) -> &JobLog {
        &self.queue.log
    }

    /// Stops accepting jobs, lets the workers finish everything already queued, and waits
    /// for them to exit.
    pub async fn shutdown(self) {
        self.queue.close();
        for worker in self.workers {
            if let Err(e) = worker.await {
                tracing::error!("notification worker ended abnormally: {:?}", e);
            }
        }
        tracing::info!("notification dispatcher stopped");
    }
}

async fn run_worker(
    worker: usize,
    receiver: Arc<tokio::sync::Mutex<UnboundedReceiver<NotificationJob>>>,
    context: WorkerContext,
) {
    loop {
        let job = receiver.lock().await.recv().await;
        let Some(job) = job else {
            break;
        };

        context.log.claim(&job.id);
        tracing::debug!(worker, job = %job.id, "claimed notification job");

        let state = deliver_with_retry(&context, &job).await;
        context.log.finish(&job.id, state);
    }
    tracing::debug!(worker, "notification worker exiting");
}

async fn deliver_with_retry(context: &WorkerContext, job: &NotificationJob) -> JobState {
    let max_attempts = context.retry.max_attempts();

    for attempt in 1..=max_attempts {
        match attempt_delivery(context, job).await {
            Ok(message) => {
                tracing::info!(job = %job.id, attempt, "{}", message);
                context.log.attempt_finished(&job.id, message);
                return JobState::Succeeded;
            }
            Err(failure) => {
                tracing::warn!(
                    job = %job.id,
                    attempt,
                    max_attempts,
                    "notification delivery failed: {}",
                    failure
                );
                context.log.attempt_finished(&job.id, failure.to_string());
                if attempt < max_attempts {
                    tokio::time::sleep(context.retry.backoff()).await;
                }
            }
        }
    }

    JobState::Failed
}

async fn attempt_delivery(
    context: &WorkerContext,
    job: &NotificationJob,
) -> Result<String, DeliveryFailure> {
    let delivery = context.channel.deliver(&job.target_contact);
    match context.attempt_timeout {
        Some(limit) => tokio::time::timeout(limit, delivery)
            .await
            .unwrap_or(Err(DeliveryFailure::TimedOut(limit))),
        None => delivery.await,
    }
}
