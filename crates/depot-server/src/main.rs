//! depot-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `DEPOT_*` environment variables, opens the SQLite store, and serves the
//! JSON API over HTTP.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use depot_server::ServerConfig;
use depot_store_sqlite::SqliteDatabase;
use tokio::{net::TcpListener, signal};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Depot asset tracking server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Validate the configuration and exit without serving.
  #[arg(long)]
  check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("DEPOT"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  if cli.check {
    server_cfg.layout().context("invalid store layout")?;
    server_cfg.alias_table().context("invalid aliases")?;
    server_cfg.location_policy().context("invalid home location")?;
    println!("configuration ok");
    return Ok(());
  }

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }

  let db = SqliteDatabase::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let state = depot_server::start(&server_cfg, &db).context("failed to start engine")?;
  let cache = state.cache.clone();
  let app = depot_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      if let Err(e) = signal::ctrl_c().await {
        tracing::error!(error = %e, "unable to listen for shutdown signal");
        std::future::pending::<()>().await;
      }
      tracing::info!("shutting down");
    })
    .await
    .context("server error")?;

  cache.shutdown();
  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
