use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use patient_core::constants::{
    DEFAULT_DELIVERY_LATENCY, DEFAULT_FAILURE_RATE, DEFAULT_STORE_FILE,
};
use patient_core::notifications::{Dispatcher, JobLog, SimulatedChannel};
use patient_core::{
    NotificationConfig, Patient, PatientFields, PatientService, RecordStore, RetryPolicy,
};

#[derive(Parser)]
#[command(name = "patients")]
#[command(about = "Patient record administration CLI")]
struct Cli {
    /// JSON file holding the patient records
    #[arg(long, env = "PATIENT_DATA_FILE", default_value = DEFAULT_STORE_FILE)]
    data_file: PathBuf,

    /// Probability that a simulated notification fails
    #[arg(long, env = "NOTIFY_FAILURE_RATE", default_value_t = DEFAULT_FAILURE_RATE)]
    failure_rate: f64,

    /// Simulated notification latency in milliseconds
    #[arg(
        long,
        env = "NOTIFY_LATENCY_MS",
        default_value_t = DEFAULT_DELIVERY_LATENCY.as_millis() as u64
    )]
    latency_ms: u64,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all patients
    List,
    /// Show one patient
    Get {
        /// Patient ID
        id: String,
    },
    /// Register a new patient
    Create {
        name: String,
        email: String,
        phone: String,
    },
    /// Change some fields of a patient
    Update {
        /// Patient ID
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
    },
    /// Delete a patient
    Delete {
        /// Patient ID
        id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("patient_core=warn".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let Some(command) = cli.command else {
        println!("Use 'patients --help' for commands");
        return Ok(());
    };

    let store = Arc::new(RecordStore::open(&cli.data_file)?);
    let config = NotificationConfig::new(
        1,
        cli.failure_rate,
        Duration::from_millis(cli.latency_ms),
        RetryPolicy::no_retry(),
        None,
    )?;
    let dispatcher = Dispatcher::start(&config, Arc::new(SimulatedChannel::from_config(&config)));
    let service = PatientService::new(store, Arc::new(dispatcher.queue()));

    match command {
        Commands::List => {
            let patients = service.list()?;
            if patients.is_empty() {
                println!("No patients found.");
            } else {
                for patient in &patients {
                    print_patient(patient);
                }
            }
        }
        Commands::Get { id } => match service.get(&id) {
            Ok(patient) => print_patient(&patient),
            Err(e) => eprintln!("Error fetching patient: {}", e),
        },
        Commands::Create { name, email, phone } => {
            let fields = PatientFields {
                name: Some(name),
                email: Some(email),
                phone: Some(phone),
            };
            match service.create(&fields) {
                Ok(id) => println!("Created patient with ID: {}", id),
                Err(e) => eprintln!("Error creating patient: {}", e),
            }
        }
        Commands::Update {
            id,
            name,
            email,
            phone,
        } => {
            let fields = PatientFields { name, email, phone };
            match service.update(&id, &fields) {
                Ok(patient) => println!("Updated patient with ID: {}", patient.id()),
                Err(e) => eprintln!("Error updating patient: {}", e),
            }
        }
        Commands::Delete { id } => match service.delete(&id) {
            Ok(()) => println!("Deleted patient with ID: {}", id),
            Err(e) => eprintln!("Error deleting patient: {}", e),
        },
    }

    let log = dispatcher.log().clone();
    dispatcher.shutdown().await;
    print_notifications(&log);

    Ok(())
}

fn print_patient(patient: &Patient) {
    println!(
        "ID: {}, Name: {}, Email: {}, Phone: {}",
        patient.id(),
        patient.name(),
        patient.email(),
        patient.phone()
    );
}

fn print_notifications(log: &JobLog) {
    for record in log.snapshot() {
        println!(
            "Notification {} to {}: {:?} ({})",
            record.id,
            record.target_contact,
            record.state,
            record.message.as_deref().unwrap_or("no result")
        );
    }
}
