//! Constants used throughout the patient core crate.

use std::time::Duration;

/// Format version written into JSON store files.
pub const STORE_FILE_VERSION: u32 = 1;

/// Default file name for the JSON record store.
pub const DEFAULT_STORE_FILE: &str = "patients.json";

/// Number of dispatcher workers when not configured.
pub const DEFAULT_NOTIFY_WORKERS: usize = 2;

/// Probability that a simulated delivery attempt fails.
pub const DEFAULT_FAILURE_RATE: f64 = 0.25;

/// Simulated time taken by one delivery attempt.
pub const DEFAULT_DELIVERY_LATENCY: Duration = Duration::from_secs(3);

/// Attempts per job. One attempt means failures are terminal.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1;

/// Pause between a failed attempt and the next one.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Upper bound on a single delivery attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Message recorded for a failed simulated delivery.
pub const DELIVERY_FAILED_MESSAGE: &str = "Sending notification failed!";

/// Maximum number of job records retained by a job log.
pub const JOB_LOG_CAPACITY: usize = 10_000;
