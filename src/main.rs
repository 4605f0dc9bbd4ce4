use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facedex::{config, workflow, SidecarExtractor, Store};
use log::info;

#[derive(Parser)]
#[command(name = "facedex")]
#[command(version, about = "Face-embedding gallery with nearest-match recognition")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a face under a name
    Register {
        /// Identity label for the face
        #[arg(short, long)]
        name: String,
        /// Photo containing exactly one face (PNG or JPEG)
        image: PathBuf,
    },
    /// Recognize faces in a photo against the gallery
    Recognize {
        /// Photo to scan (PNG or JPEG)
        image: PathBuf,
    },
    /// List registered identities
    List,
    /// Remove every record from the gallery
    Purge,
    /// Open config file in editor
    Config,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(None)?;

    match cli.command {
        Commands::Register { name, image } => register(&cfg, &name, &image),
        Commands::Recognize { image } => recognize(&cfg, &image),
        Commands::List => list(&cfg),
        Commands::Purge => purge(&cfg),
        Commands::Config => open_config(),
    }
}

fn register(cfg: &config::Config, name: &str, image: &Path) -> Result<()> {
    let bytes =
        std::fs::read(image).with_context(|| format!("reading {}", image.display()))?;
    let store = Store::open(&cfg.store_dir).context("opening gallery store")?;
    let extractor = SidecarExtractor::new(&cfg.extractor);

    let result = workflow::register(&store, &extractor, name, &bytes);
    let response = workflow::RegisterResponse::from_result(name, result);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn recognize(cfg: &config::Config, image: &Path) -> Result<()> {
    let bytes =
        std::fs::read(image).with_context(|| format!("reading {}", image.display()))?;
    let store = Store::open(&cfg.store_dir).context("opening gallery store")?;
    let extractor = SidecarExtractor::new(&cfg.extractor);

    let result = workflow::recognize(&store, &extractor, &bytes, cfg.threshold);
    let response = workflow::RecognizeResponse::from_result(result);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn list(cfg: &config::Config) -> Result<()> {
    let store = Store::open(&cfg.store_dir).context("opening gallery store")?;
    let records = store.scan_all().context("reading gallery")?;

    if records.is_empty() {
        info!("Gallery is empty");
        return Ok(());
    }
    for record in records {
        println!(
            "{:>6}  {}  dim={}  created_at={}",
            record.id,
            record.name,
            record.embedding.len(),
            record.created_at
        );
    }
    Ok(())
}

fn purge(cfg: &config::Config) -> Result<()> {
    let store = Store::open(&cfg.store_dir).context("opening gallery store")?;
    store.purge().context("purging gallery")?;
    info!("✓ Gallery purged");
    Ok(())
}

fn open_config() -> Result<()> {
    let config_path = config::CONFIG_PATH.as_os_str();
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {:?}", config_path);

    let status = std::process::Command::new(editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
