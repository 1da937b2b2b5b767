//! Wiring for the Depot server: configuration, engine start-up, and the
//! HTTP router.

use std::{collections::BTreeMap, path::PathBuf, sync::Arc, time::Duration};

use axum::Router;
use depot_api::AppState;
use depot_core::{
  Error, Result,
  alias::AliasTable,
  category::Category,
  layout::{StoreLayout, StoreSpec},
};
use depot_engine::{
  AggregationCache, CacheOptions, LocationPolicy, ReconcileOptions, Reconciler, StoreSet,
  TransitionEngine,
};
use depot_store_sqlite::{SqliteCollection, SqliteDatabase};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `DEPOT_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  pub host:                     String,
  pub port:                     u16,
  pub store_path:               PathBuf,
  #[serde(default = "default_home_location")]
  pub home_location:            String,
  /// Store names in priority order. Defaults to the built-in layout.
  #[serde(default)]
  pub stores:                   Option<Vec<StoreSpec>>,
  /// Replaces the built-in alias lists when non-empty.
  #[serde(default)]
  pub aliases:                  BTreeMap<Category, Vec<String>>,
  #[serde(default = "default_resubscribe_delay_ms")]
  pub resubscribe_delay_ms:     u64,
  #[serde(default = "default_reconcile_retry_delay_ms")]
  pub reconcile_retry_delay_ms: u64,
  #[serde(default = "default_reconcile_max_attempts")]
  pub reconcile_max_attempts:   u32,
}

fn default_home_location() -> String { LocationPolicy::DEFAULT_HOME.to_owned() }
fn default_resubscribe_delay_ms() -> u64 { 2_000 }
fn default_reconcile_retry_delay_ms() -> u64 { 5_000 }
fn default_reconcile_max_attempts() -> u32 { 5 }

impl ServerConfig {
  pub fn layout(&self) -> Result<StoreLayout> {
    match &self.stores {
      Some(stores) => StoreLayout::new(stores.clone()),
      None => Ok(StoreLayout::default()),
    }
  }

  pub fn alias_table(&self) -> Result<AliasTable> {
    if self.aliases.is_empty() {
      return Ok(AliasTable::default());
    }
    AliasTable::new(self.aliases.iter().map(|(c, a)| (*c, a.iter())))
  }

  pub fn location_policy(&self) -> Result<LocationPolicy> {
    if self.home_location.trim().is_empty() {
      return Err(Error::ValidationFailed("home_location cannot be empty".into()));
    }
    Ok(LocationPolicy::new(self.home_location.clone()))
  }

  pub fn cache_options(&self) -> CacheOptions {
    CacheOptions {
      resubscribe_delay: Duration::from_millis(self.resubscribe_delay_ms),
      ..Default::default()
    }
  }

  pub fn reconcile_options(&self) -> ReconcileOptions {
    ReconcileOptions {
      retry_delay:  Duration::from_millis(self.reconcile_retry_delay_ms),
      max_attempts: self.reconcile_max_attempts,
      ..Default::default()
    }
  }
}

// ─── Start-up ────────────────────────────────────────────────────────────────

/// Validate `config`, open one collection per store in `db`, and start the
/// aggregation cache and the reconciler. Must run inside a Tokio runtime.
///
/// Nothing is spawned unless the whole configuration is valid.
pub fn start(config: &ServerConfig, db: &SqliteDatabase) -> Result<AppState<SqliteCollection>> {
  let layout = config.layout()?;
  let aliases = config.alias_table()?;
  let policy = config.location_policy()?;
  let store_count = layout.len();

  let stores = Arc::new(StoreSet::new(layout, |spec| db.collection(&spec.name)));
  let reconciler = Reconciler::new(stores.clone(), config.reconcile_options());
  let (reconcile_tx, _) = reconciler.clone().spawn();
  let cache = AggregationCache::spawn(stores.clone(), config.cache_options());

  tracing::info!(
    stores = store_count,
    home = %policy.home_location(),
    "engine started"
  );
  let engine =
    TransitionEngine::new(stores, policy, Arc::new(aliases)).with_reconciler(reconcile_tx);
  Ok(AppState { engine: Arc::new(engine), cache, reconciler })
}

/// The full HTTP surface: the JSON API under `/api`, with request tracing.
pub fn router(state: AppState<SqliteCollection>) -> Router {
  Router::new()
    .nest("/api", depot_api::api_router(state))
    .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use axum::{
    body::Body,
    http::{Request, StatusCode},
  };
  use config::{Config, File, FileFormat};
  use tower::ServiceExt as _;

  use super::*;

  fn parse(toml: &str) -> ServerConfig {
    Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  const MINIMAL: &str = r#"
    host = "127.0.0.1"
    port = 8640
    store_path = ":memory:"
  "#;

  #[test]
  fn minimal_config_uses_defaults() {
    let cfg = parse(MINIMAL);
    assert_eq!(cfg.home_location, "DepartmentIT");
    assert_eq!(cfg.layout().unwrap(), StoreLayout::default());
    assert_eq!(
      cfg.alias_table().unwrap().canonicalize("laptop"),
      Some(Category::Computer)
    );
    assert_eq!(cfg.cache_options().resubscribe_delay, Duration::from_secs(2));
    assert_eq!(cfg.reconcile_options().max_attempts, 5);
  }

  #[test]
  fn full_config_overrides_defaults() {
    let cfg = parse(
      r#"
      host = "0.0.0.0"
      port = 9000
      store_path = "/var/lib/depot.sqlite"
      home_location = "Data Center"
      resubscribe_delay_ms = 50
      stores = [
        { category = "quarantine", name = "Gary" },
        { category = "computer",   name = "PCs" },
        { category = "monitor",    name = "Screens" },
        { category = "server",     name = "Servers" },
        { category = "switch",     name = "Switches" },
        { category = "tablet",     name = "Tablets" },
      ]

      [aliases]
      computer = ["box"]
      "#,
    );

    let layout = cfg.layout().unwrap();
    assert_eq!(layout.priority(Category::Quarantine), 0);
    assert_eq!(layout.name_of(Category::Computer), "PCs");

    let aliases = cfg.alias_table().unwrap();
    assert_eq!(aliases.canonicalize("BOX"), Some(Category::Computer));
    assert_eq!(aliases.canonicalize("laptop"), None);

    assert_eq!(
      cfg.location_policy().unwrap().home_location(),
      "Data Center"
    );
    assert_eq!(cfg.cache_options().resubscribe_delay, Duration::from_millis(50));
  }

  #[test]
  fn incomplete_layout_is_rejected() {
    let cfg = parse(
      r#"
      host = "127.0.0.1"
      port = 8640
      store_path = ":memory:"
      stores = [{ category = "computer", name = "Computer" }]
      "#,
    );
    assert!(matches!(cfg.layout(), Err(Error::Layout(_))));
  }

  #[test]
  fn conflicting_aliases_are_rejected() {
    let cfg = parse(
      r#"
      host = "127.0.0.1"
      port = 8640
      store_path = ":memory:"
      [aliases]
      computer = ["unit"]
      server = ["unit"]
      "#,
    );
    assert!(matches!(cfg.alias_table(), Err(Error::AliasConflict { .. })));
  }

  #[tokio::test]
  async fn invalid_config_starts_nothing() {
    let mut cfg = parse(MINIMAL);
    cfg.home_location = "  ".into();
    let db = SqliteDatabase::open_in_memory().await.unwrap();
    assert!(matches!(start(&cfg, &db), Err(Error::ValidationFailed(_))));
  }

  #[tokio::test]
  async fn serves_api_under_prefix() {
    let cfg = parse(MINIMAL);
    let db = SqliteDatabase::open_in_memory().await.unwrap();
    let state = start(&cfg, &db).unwrap();

    let req = Request::builder().uri("/api/summary").body(Body::empty()).unwrap();
    let resp = router(state.clone()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let summary: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(summary["stores"].as_array().unwrap().len(), 6);

    let req = Request::builder().uri("/summary").body(Body::empty()).unwrap();
    let resp = router(state.clone()).oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    state.cache.shutdown();
  }
}
