//! Handlers for per-store listings and the consistency report.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/stores/{category}/assets` | Read straight from the store, not the cache |
//! | `GET`  | `/consistency` | Tags held by more than one store |

use axum::{
  Json,
  extract::{Path, State},
};
use depot_core::{
  ConsistencyWarning, Error,
  store::{AssetStore, StoredAsset},
};
use serde::Serialize;

use crate::{AppState, error::ApiError};

/// `GET /stores/{category}/assets`
pub async fn list_assets<S: AssetStore>(
  State(state): State<AppState<S>>,
  Path(category): Path<String>,
) -> Result<Json<Vec<StoredAsset>>, ApiError> {
  let category = state.engine.classify_category(&category)?;
  let assets = state
    .engine
    .stores()
    .store(category)?
    .list_all()
    .await
    .map_err(|e| Error::backend(category, e))?;
  Ok(Json(assets))
}

#[derive(Debug, Serialize)]
pub struct ConsistencyReport {
  pub consistent: bool,
  pub duplicates: Vec<ConsistencyWarning>,
}

/// `GET /consistency`
pub async fn consistency<S: AssetStore + 'static>(
  State(state): State<AppState<S>>,
) -> Result<Json<ConsistencyReport>, ApiError> {
  let duplicates = state.reconciler.sweep().await?;
  Ok(Json(ConsistencyReport { consistent: duplicates.is_empty(), duplicates }))
}
