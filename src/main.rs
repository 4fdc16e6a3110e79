use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use api_shared::BearerToken;
use patient_core::config::{
    attempt_timeout_from_env_value, duration_ms_from_env_value, parse_env_value,
};
use patient_core::constants::{
    DEFAULT_DELIVERY_LATENCY, DEFAULT_FAILURE_RATE, DEFAULT_MAX_ATTEMPTS, DEFAULT_NOTIFY_WORKERS,
    DEFAULT_RETRY_BACKOFF,
};
use patient_core::notifications::{Dispatcher, SimulatedChannel};
use patient_core::{CoreConfig, NotificationConfig, PatientService, RecordStore, RetryPolicy};

/// Main entry point for the patient service
///
/// Starts the REST server and the notification dispatcher, then waits for Ctrl-C. On shutdown
/// the server stops accepting connections first and the dispatcher drains its queue after.
///
/// # Environment Variables
/// - `PATIENT_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `PATIENT_API_TOKEN`: bearer token clients must present (required)
/// - `PATIENT_DATA_FILE`: JSON file to persist records in (default: in-memory only)
/// - `NOTIFY_WORKERS`, `NOTIFY_FAILURE_RATE`, `NOTIFY_LATENCY_MS`, `NOTIFY_MAX_ATTEMPTS`,
///   `NOTIFY_RETRY_BACKOFF_MS`, `NOTIFY_ATTEMPT_TIMEOUT_MS`: notification tuning
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("patient_run=info".parse()?)
                .add_directive("patient_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("PATIENT_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let credentials = BearerToken::from_env_value(std::env::var("PATIENT_API_TOKEN").ok())?;
    let config = config_from_env()?;

    let store = match config.data_file() {
        Some(path) => {
            tracing::info!("++ Using patient data file {}", path.display());
            RecordStore::open(path)?
        }
        None => {
            tracing::warn!("PATIENT_DATA_FILE not set, records will not survive a restart");
            RecordStore::in_memory()
        }
    };

    let channel = Arc::new(SimulatedChannel::from_config(config.notifications()));
    let dispatcher = Dispatcher::start(config.notifications(), channel);
    let patient_service = PatientService::new(Arc::new(store), Arc::new(dispatcher.queue()));

    let app = api_rest::router(AppState::new(patient_service, Arc::new(credentials)));

    tracing::info!("++ Starting patient REST on {}", rest_addr);
    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("REST server stopped, draining notifications");
    dispatcher.shutdown().await;

    Ok(())
}

fn config_from_env() -> anyhow::Result<CoreConfig> {
    let env = |name: &str| std::env::var(name).ok();

    let retry = RetryPolicy::new(
        parse_env_value("NOTIFY_MAX_ATTEMPTS", env("NOTIFY_MAX_ATTEMPTS"), DEFAULT_MAX_ATTEMPTS)?,
        duration_ms_from_env_value(
            "NOTIFY_RETRY_BACKOFF_MS",
            env("NOTIFY_RETRY_BACKOFF_MS"),
            DEFAULT_RETRY_BACKOFF,
        )?,
    )?;

    let notifications = NotificationConfig::new(
        parse_env_value("NOTIFY_WORKERS", env("NOTIFY_WORKERS"), DEFAULT_NOTIFY_WORKERS)?,
        parse_env_value(
            "NOTIFY_FAILURE_RATE",
            env("NOTIFY_FAILURE_RATE"),
            DEFAULT_FAILURE_RATE,
        )?,
        duration_ms_from_env_value(
            "NOTIFY_LATENCY_MS",
            env("NOTIFY_LATENCY_MS"),
            DEFAULT_DELIVERY_LATENCY,
        )?,
        retry,
        attempt_timeout_from_env_value(env("NOTIFY_ATTEMPT_TIMEOUT_MS"))?,
    )?;

    let data_file = env("PATIENT_DATA_FILE")
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from);

    Ok(CoreConfig::new(data_file, notifications))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for Ctrl-C: {}", e);
    }
}
