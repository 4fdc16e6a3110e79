//! Delivery channels: the thing that actually sends a notification.

use crate::config::NotificationConfig;
use crate::constants::DELIVERY_FAILED_MESSAGE;
use crate::error::DeliveryFailure;
use async_trait::async_trait;
use patient_types::PhoneNumber;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Sends one notification to one contact.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Performs a single delivery attempt, returning a human-readable result message.
    async fn deliver(&self, contact: &PhoneNumber) -> Result<String, DeliveryFailure>;
}

/// Stand-in for an SMS gateway: waits a fixed latency, then fails with a set probability.
pub struct SimulatedChannel {
    latency: Duration,
    failure_rate: f64,
    rng: Mutex<StdRng>,
}

impl SimulatedChannel {
    pub fn new(latency: Duration, failure_rate: f64) -> Self {
        Self {
            latency,
            failure_rate,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic variant for reproducible runs.
    pub fn with_seed(latency: Duration, failure_rate: f64, seed: u64) -> Self {
        Self {
            latency,
            failure_rate,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn from_config(config: &NotificationConfig) -> Self {
        Self::new(config.latency(), config.failure_rate())
    }

    fn roll_failure(&self) -> bool {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.gen::<f64>() < self.failure_rate
    }
}

#[async_trait]
impl DeliveryChannel for SimulatedChannel {
    async fn deliver(&self, contact: &PhoneNumber) -> Result<String, DeliveryFailure> {
        tokio::time::sleep(self.latency).await;

        if self.roll_failure() {
            return Err(DeliveryFailure::Rejected(DELIVERY_FAILED_MESSAGE.into()));
        }
        Ok(format!("Notification sent successfully to {contact}"))
    }
}
