//! Clinic Telemetry CLI - scriptable doctor client.
//!
//! Logs go to stderr; results are printed to stdout as JSON.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use clinic_telemetry_core::{ClientConfig, Direction, Session};
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Environment variable holding the login password.
const ENV_PASSWORD: &str = "CLINIC_TELEMETRY_PASSWORD";

#[derive(Parser, Debug)]
#[command(name = "clinic-telemetry")]
#[command(about = "Doctor client for the clinical telemetry server")]
struct Args {
    /// Server host (overrides config file and environment)
    #[arg(long)]
    host: Option<String>,

    /// Server port (overrides config file and environment)
    #[arg(short, long)]
    port: Option<u16>,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Doctor username; the password is read from CLINIC_TELEMETRY_PASSWORD
    #[arg(short, long)]
    user: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List assigned patients, optionally filtered by name or DNI
    Patients { query: Option<String> },

    /// Show a patient and their diagnosis files
    Patient { hin: i32 },

    /// Page through a recording
    Recording {
        diagnosis_file_id: i32,

        /// Number of fragments to fetch, starting at the first
        #[arg(long, default_value = "1")]
        fragments: u32,
    },

    /// Save a diagnosis file as text
    DownloadDiagnosis {
        diagnosis_file_id: i32,

        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// Save a recording as ECG/EDA CSV
    DownloadRecording {
        diagnosis_file_id: i32,

        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// Diagnosis files completed recently
    Recent,

    /// Record a diagnosis and medication for a diagnosis file
    Complete {
        diagnosis_file_id: i32,
        diagnosis: String,
        medication: String,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = load_config(&args)?;
    info!("Connecting to {}:{}", config.host, config.port);

    let mut session = Session::connect(&config)
        .with_context(|| format!("failed to connect to {}:{}", config.host, config.port))?;

    let password = std::env::var(ENV_PASSWORD)
        .with_context(|| format!("{} is not set", ENV_PASSWORD))?;
    let outcome = session.login(&args.user, &password)?;
    if !outcome.ok {
        bail!("login rejected: {}", outcome.message);
    }

    let result = run(&mut session, args.command);

    if let Err(e) = session.log_out() {
        tracing::debug!("log out failed: {}", e);
    }
    result
}

/// Defaults, then the config file, then the environment, then flags.
fn load_config(args: &Args) -> Result<ClientConfig> {
    let config = match &args.config {
        Some(path) => ClientConfig::from_json_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ClientConfig::default(),
    };
    let mut config = config.with_env()?;

    if let Some(host) = &args.host {
        config.host = host.clone();
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    Ok(config)
}

fn run(session: &mut Session, command: Command) -> Result<()> {
    match command {
        Command::Patients { query } => {
            let directory = session.list_patients()?;
            print_json(&directory.filter(query.as_deref().unwrap_or("")))
        }
        Command::Patient { hin } => {
            let patient = session
                .view_patient(hin)
                .with_context(|| format!("failed to load patient {}", hin))?;
            print_json(patient)
        }
        Command::Recording {
            diagnosis_file_id,
            fragments,
        } => {
            let mut pages = vec![session.view_recording(diagnosis_file_id)?.clone()];
            for _ in 1..fragments {
                pages.push(session.change_fragment(Direction::Next)?.clone());
            }
            print_json(&pages)
        }
        Command::DownloadDiagnosis {
            diagnosis_file_id,
            out,
        } => {
            let export = session.download_diagnosis_file(diagnosis_file_id)?;
            let path = export
                .write_to(&out)
                .with_context(|| format!("failed to write into {}", out.display()))?;
            info!("Saved {}", path.display());
            print_json(&path)
        }
        Command::DownloadRecording {
            diagnosis_file_id,
            out,
        } => {
            let export = session.download_recording(diagnosis_file_id)?;
            let path = export
                .write_to(&out)
                .with_context(|| format!("failed to write into {}", out.display()))?;
            info!("Saved {} ({} rows)", path.display(), export.row_count());
            print_json(&path)
        }
        Command::Recent => {
            let decoded = session.recently_finished()?;
            print_json(&decoded)
        }
        Command::Complete {
            diagnosis_file_id,
            diagnosis,
            medication,
        } => {
            session.complete_diagnosis_file(diagnosis_file_id, &diagnosis, &medication)?;
            info!("Diagnosis file {} completed", diagnosis_file_id);
            Ok(())
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
