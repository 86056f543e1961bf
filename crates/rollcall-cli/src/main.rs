use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Datelike, Local};
use clap::{Parser, Subcommand};

use rollcall_core::{store::IdentityRegistry, types::Descriptor};
use rollcall_engine::{month_statuses, tally, Engine, EngineConfig, NoLocalExtractor};
use rollcall_store::{FsEvidenceStore, SqliteStore};

#[derive(Parser)]
#[command(name = "rollcall", about = "Rollcall biometric attendance CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the identity registry
    #[command(subcommand)]
    Identity(IdentityCommands),
    /// Enroll a face template from capture samples
    Enroll {
        /// Identity code to enroll
        #[arg(short, long)]
        code: String,
        /// Sample files: images, or descriptor JSON with --descriptors
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Treat the files as precomputed descriptor JSON arrays
        #[arg(long)]
        descriptors: bool,
    },
    /// Check the matched identity in for today
    CheckIn {
        /// Capture file: an image, or descriptor JSON with --descriptor
        file: PathBuf,
        /// Treat the file as a precomputed descriptor JSON array
        #[arg(long)]
        descriptor: bool,
        #[arg(short, long)]
        location: Option<String>,
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Check the matched identity out for today
    CheckOut {
        /// Capture file: an image, or descriptor JSON with --descriptor
        file: PathBuf,
        /// Treat the file as a precomputed descriptor JSON array
        #[arg(long)]
        descriptor: bool,
        #[arg(short, long)]
        location: Option<String>,
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// One-to-one verification against one identity's template
    Verify {
        /// Identity code to verify against
        #[arg(short, long)]
        code: String,
        /// Capture file: an image, or descriptor JSON with --descriptor
        file: PathBuf,
        /// Treat the file as a precomputed descriptor JSON array
        #[arg(long)]
        descriptor: bool,
    },
    /// Monthly attendance recap for one identity
    Recap {
        /// Identity code
        #[arg(short, long)]
        code: String,
        /// Year (defaults to the current year)
        #[arg(short, long)]
        year: Option<i32>,
        /// Month 1-12 (defaults to the current month)
        #[arg(short, long)]
        month: Option<u32>,
    },
}

#[derive(Subcommand)]
enum IdentityCommands {
    /// Register a new identity
    Add {
        /// External code, e.g. an employee number
        #[arg(short, long)]
        code: String,
        /// Display name
        #[arg(short, long)]
        name: String,
    },
    /// List registered identities
    List,
    /// Deactivate an identity (excluded from the gallery)
    Disable { code: String },
    /// Reactivate an identity
    Enable { code: String },
}

type CliEngine = Engine<NoLocalExtractor, SqliteStore, FsEvidenceStore>;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = EngineConfig::from_env();

    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating data directory {}", parent.display()))?;
    }
    let store = SqliteStore::open(&config.db_path).await?;
    let evidence = FsEvidenceStore::new(config.evidence_dir.clone());
    let engine = Engine::new(NoLocalExtractor, store.clone(), evidence, config);

    match cli.command {
        Commands::Identity(cmd) => identity(&store, cmd).await,
        Commands::Enroll {
            code,
            files,
            descriptors,
        } => enroll(&engine, &code, &files, descriptors).await,
        Commands::CheckIn {
            file,
            descriptor,
            location,
            notes,
        } => check_in(&engine, &file, descriptor, location, notes).await,
        Commands::CheckOut {
            file,
            descriptor,
            location,
            notes,
        } => check_out(&engine, &file, descriptor, location, notes).await,
        Commands::Verify {
            code,
            file,
            descriptor,
        } => verify(&engine, &code, &file, descriptor).await,
        Commands::Recap { code, year, month } => recap(&store, &engine, &code, year, month).await,
    }
}

async fn identity(store: &SqliteStore, cmd: IdentityCommands) -> Result<()> {
    match cmd {
        IdentityCommands::Add { code, name } => {
            let identity = store.add_identity(&code, &name).await?;
            println!("added {} ({})", identity.code, identity.display_name);
        }
        IdentityCommands::List => {
            for identity in store.list_identities().await? {
                println!(
                    "{}\t{}\t{}",
                    identity.code,
                    identity.display_name,
                    if identity.active { "active" } else { "inactive" }
                );
            }
        }
        IdentityCommands::Disable { code } => {
            if store.set_active(&code, false).await? {
                println!("disabled {code}");
            } else {
                anyhow::bail!("no such identity: {code}");
            }
        }
        IdentityCommands::Enable { code } => {
            if store.set_active(&code, true).await? {
                println!("enabled {code}");
            } else {
                anyhow::bail!("no such identity: {code}");
            }
        }
    }
    Ok(())
}

async fn enroll(engine: &CliEngine, code: &str, files: &[PathBuf], descriptors: bool) -> Result<()> {
    let summary = if descriptors {
        let mut parsed = Vec::with_capacity(files.len());
        for file in files {
            parsed.push(load_descriptor(file)?);
        }
        engine.enroll_with_descriptors(code, parsed).await?
    } else {
        let mut images = Vec::with_capacity(files.len());
        for file in files {
            images.push(load_bytes(file)?);
        }
        engine.enroll(code, &images).await?
    };

    println!(
        "enrolled {} ({}): {} of {} samples used, {}-dim template",
        summary.identity.code,
        summary.identity.display_name,
        summary.images_used,
        summary.images_received,
        summary.dim,
    );
    if summary.images_invalid > 0 {
        println!("  {} sample(s) were unusable and skipped", summary.images_invalid);
    }
    Ok(())
}

async fn check_in(
    engine: &CliEngine,
    file: &Path,
    descriptor: bool,
    location: Option<String>,
    notes: Option<String>,
) -> Result<()> {
    let receipt = if descriptor {
        let probe = load_descriptor(file)?;
        engine
            .check_in_with_descriptor(&probe, location, notes)
            .await?
    } else {
        engine.check_in(&load_bytes(file)?, location, notes).await?
    };

    println!(
        "{} ({}) checked in {} at {} (similarity {:.2})",
        receipt.identity.code,
        receipt.identity.display_name,
        receipt.status,
        receipt.checked_in_at.with_timezone(&Local).format("%H:%M:%S"),
        receipt.similarity,
    );
    Ok(())
}

async fn check_out(
    engine: &CliEngine,
    file: &Path,
    descriptor: bool,
    location: Option<String>,
    notes: Option<String>,
) -> Result<()> {
    let receipt = if descriptor {
        let probe = load_descriptor(file)?;
        engine
            .check_out_with_descriptor(&probe, location, notes)
            .await?
    } else {
        engine.check_out(&load_bytes(file)?, location, notes).await?
    };

    println!(
        "{} ({}) checked out at {} (in since {}, similarity {:.2})",
        receipt.identity.code,
        receipt.identity.display_name,
        receipt.checked_out_at.with_timezone(&Local).format("%H:%M:%S"),
        receipt.checked_in_at.with_timezone(&Local).format("%H:%M:%S"),
        receipt.similarity,
    );
    Ok(())
}

async fn verify(engine: &CliEngine, code: &str, file: &Path, descriptor: bool) -> Result<()> {
    let verification = if descriptor {
        let probe = load_descriptor(file)?;
        engine.verify_with_descriptor(code, &probe).await?
    } else {
        engine.verify(code, &load_bytes(file)?).await?
    };

    println!(
        "{}: {} (similarity {:.2})",
        code,
        if verification.verified {
            "verified"
        } else {
            "not verified"
        },
        verification.similarity,
    );
    Ok(())
}

async fn recap(
    store: &SqliteStore,
    engine: &CliEngine,
    code: &str,
    year: Option<i32>,
    month: Option<u32>,
) -> Result<()> {
    let today = Local::now().date_naive();
    let year = year.unwrap_or_else(|| today.year());
    let month = month.unwrap_or_else(|| today.month());

    let identity = store
        .get_active(code)
        .await?
        .with_context(|| format!("no active identity with code {code}"))?;

    let days = month_statuses(
        store,
        identity.identity_id,
        year,
        month,
        today,
        engine.config().off_day,
    )
    .await?;
    let counts = tally(&days);

    println!(
        "{}-{:02} recap for {} ({})",
        year, month, identity.code, identity.display_name
    );
    let grid: String = days.iter().map(|d| d.cell()).collect();
    println!("  {grid}");
    println!(
        "  present {}  late {}  absent {}  sick {}  permission {}",
        counts.present, counts.late, counts.absent, counts.sick, counts.permission
    );
    Ok(())
}

fn load_bytes(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn load_descriptor(path: &Path) -> Result<Descriptor> {
    let bytes = load_bytes(path)?;
    let values: Vec<f32> = serde_json::from_slice(&bytes)
        .with_context(|| format!("parsing descriptor JSON from {}", path.display()))?;
    Ok(Descriptor::new(values))
}
