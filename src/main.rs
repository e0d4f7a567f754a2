use std::{
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

use chrono::Utc;
use clap::Parser;
use droplet_rotator::{
    api::DigitalOceanClient,
    config::{self, RotatorConfig},
    observability,
    rotation::{RotationRunResult, Rotator, SnapshotStatus},
};

const DEFAULT_CONFIG_PATH: &str = "droplet-rotator.toml";

const EXIT_SUCCESS: u8 = 0;
/// Exit code for fatal errors (config, create under `abort`, listing).
const EXIT_FATAL: u8 = 1;
/// Exit code when the run completed but something failed along the way.
const EXIT_PARTIAL: u8 = 2;

/// CLI arguments for the droplet snapshot rotator
#[derive(Parser, Debug)]
#[command(version, about = "Rotate DigitalOcean droplet snapshots", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Create a snapshot and delete expired ones (default)
    Run {
        /// Log what would be created and deleted without doing it
        #[arg(long)]
        dry_run: bool,
    },
    /// List snapshots of the configured droplet and their eligibility
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Initialize a new configuration file
    Init {
        /// Path to create the config file (defaults to --config)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let code = match args.command {
        Some(Command::Init { output, force }) => run_init(output.unwrap_or(args.config), force),
        Some(Command::List { json }) => run_list(&args.config, json).await,
        Some(Command::Run { dry_run }) => run_rotation(&args.config, dry_run).await,
        None => run_rotation(&args.config, false).await,
    };

    ExitCode::from(code)
}

/// Write the starter configuration file.
fn run_init(output: PathBuf, force: bool) -> u8 {
    if output.exists() && !force {
        eprintln!(
            "Config file already exists: {}\nUse --force to overwrite.",
            output.display()
        );
        return EXIT_FATAL;
    }

    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        eprintln!("Failed to create directory {}: {}", parent.display(), e);
        return EXIT_FATAL;
    }

    if let Err(e) = std::fs::write(&output, config::default_config_toml()) {
        eprintln!("Failed to write config file {}: {}", output.display(), e);
        return EXIT_FATAL;
    }

    println!("Created config file: {}", output.display());
    println!("Set DIGITALOCEAN_TOKEN and edit rotation.droplet_id before the first run.");
    EXIT_SUCCESS
}

/// Load config, initialize tracing and build the rotator.
fn setup(config_path: &Path, force_dry_run: bool) -> Result<Rotator, u8> {
    let mut config = RotatorConfig::from_file(config_path).map_err(|e| {
        eprintln!("Error: {e}");
        EXIT_FATAL
    })?;

    observability::init_tracing(&config.logging).map_err(|e| {
        eprintln!("Error: {e}");
        EXIT_FATAL
    })?;

    if force_dry_run {
        config.rotation.dry_run = true;
    }

    tracing::debug!(config = ?config, "Loaded configuration");

    let client = DigitalOceanClient::new(&config.api).map_err(|e| {
        tracing::error!(error = %e, "Failed to build HTTP client");
        EXIT_FATAL
    })?;

    Ok(Rotator::new(Arc::new(client), config.rotation))
}

async fn run_rotation(config_path: &Path, dry_run: bool) -> u8 {
    let rotator = match setup(config_path, dry_run) {
        Ok(rotator) => rotator,
        Err(code) => return code,
    };

    match rotator.run().await {
        Ok(result) => exit_code_for(&result),
        Err(e) => {
            tracing::error!(error = %e, "Snapshot rotation aborted");
            EXIT_FATAL
        }
    }
}

/// Exit code for a finished run. The rotator has already logged each failure.
fn exit_code_for(result: &RotationRunResult) -> u8 {
    if result.has_failures() {
        EXIT_PARTIAL
    } else {
        EXIT_SUCCESS
    }
}

async fn run_list(config_path: &Path, json: bool) -> u8 {
    let rotator = match setup(config_path, false) {
        Ok(rotator) => rotator,
        Err(code) => return code,
    };

    let statuses = match rotator.status_at(Utc::now()).await {
        Ok(statuses) => statuses,
        Err(e) => {
            tracing::error!(error = %e, "Failed to list snapshots");
            return EXIT_FATAL;
        }
    };

    if json {
        match serde_json::to_string_pretty(&statuses) {
            Ok(out) => println!("{out}"),
            Err(e) => {
                eprintln!("Failed to serialize snapshot list: {e}");
                return EXIT_FATAL;
            }
        }
    } else {
        print_table(&statuses, rotator.config().threshold_hours);
    }

    EXIT_SUCCESS
}

fn print_table(statuses: &[SnapshotStatus], threshold_hours: u64) {
    if statuses.is_empty() {
        println!("No snapshots found.");
        return;
    }

    let name_width = statuses
        .iter()
        .map(|s| s.snapshot.name.len())
        .max()
        .unwrap_or(0)
        .max("NAME".len());

    println!(
        "{:<12}  {:<name_width$}  {:<20}  {:>9}  STATUS",
        "ID", "NAME", "CREATED", "AGE (h)"
    );
    for status in statuses {
        let label = if status.expired {
            "expired"
        } else if status.managed {
            "kept"
        } else {
            "unmanaged"
        };
        println!(
            "{:<12}  {:<name_width$}  {:<20}  {:>9}  {}",
            status.snapshot.id,
            status.snapshot.name,
            status
                .snapshot
                .created_at
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            status.age_hours,
            label
        );
    }
    println!("\nSnapshots older than {threshold_hours}h with the configured prefix are expired.");
}
