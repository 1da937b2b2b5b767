//! `depot`: command-line client for the Depot asset tracking server.
//!
//! # Usage
//!
//! ```
//! depot --url http://localhost:8640 summary
//! depot log A001 --category laptop --location DepartmentIT --owner alice
//! depot move A001 quarantine
//! ```

mod client;
mod render;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig, ScanResult};
use depot_core::asset::Attributes;
use serde::Deserialize;

const DEFAULT_URL: &str = "http://localhost:8640";

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "depot", about = "Command-line client for the Depot asset tracker")]
struct Args {
  /// Path to a TOML config file (url).
  #[arg(short, long, value_name = "FILE")]
  config: Option<std::path::PathBuf>,

  /// Base URL of the depot server (default: http://localhost:8640).
  #[arg(long, env = "DEPOT_URL")]
  url: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Asset counts per store and overall.
  Summary,
  /// Most recent check-ins and check-outs.
  Activity {
    #[arg(short = 'n', long)]
    limit:  Option<usize>,
    /// Only tags containing this text (case-insensitive).
    #[arg(short, long)]
    filter: Option<String>,
  },
  /// Show which store holds a tag.
  Locate { tag: String },
  /// Register an asset, or record that it moved to a new location.
  Log {
    tag:      String,
    /// Item type; any known alias works.
    #[arg(short, long)]
    category: String,
    #[arg(short, long)]
    location: String,
    #[arg(long)]
    owner:    Option<String>,
    #[arg(long)]
    model:    Option<String>,
    #[arg(long)]
    serial:   Option<String>,
  },
  /// Move an asset into another store, unchanged.
  Move { tag: String, category: String },
  /// Resolve scanner input as a category alias or a tag.
  Scan { input: String },
  /// Every asset in one store.
  List { category: String },
  /// Tags currently held by more than one store.
  Consistency,
}

// ─── Config file ─────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url: String,
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags override config file, which overrides defaults.
  let api_config = ApiConfig {
    base_url: args
      .url
      .or_else(|| (!file_cfg.url.is_empty()).then(|| file_cfg.url.clone()))
      .unwrap_or_else(|| DEFAULT_URL.to_string()),
  };
  let client = ApiClient::new(api_config)?;

  let output = match args.command {
    Command::Summary => render::summary(&client.summary().await?),
    Command::Activity { limit, filter } => {
      render::activity(&client.activity(limit, filter.as_deref()).await?)
    }
    Command::Locate { tag } => render::located(&client.locate(&tag).await?),
    Command::Log { tag, category, location, owner, model, serial } => {
      let attributes = Attributes { owner, model, serial };
      render::report(&client.transition(&tag, &category, &location, &attributes).await?)
    }
    Command::Move { tag, category } => render::report(&client.move_to(&tag, &category).await?),
    Command::Scan { input } => match client.scan(&input).await? {
      ScanResult::Category { category } => format!("{input:?} is the {category} category\n"),
      ScanResult::Asset(located) => render::located(&located),
    },
    Command::List { category } => render::stored(&client.list(&category).await?),
    Command::Consistency => render::duplicates(&client.consistency().await?.duplicates),
  };

  print!("{output}");
  Ok(())
}
