//! Handler for `POST /scan`, the entry point for capture devices.
//!
//! A scanned string is either a category alias (a label stuck on a shelf,
//! say) or an asset tag. Aliases are checked first.

use axum::{Json, extract::State};
use depot_core::{asset::AssetTag, category::Category, store::AssetStore};
use depot_engine::Located;
use serde::{Deserialize, Serialize};

use crate::{AppState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ScanBody {
  pub input: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScanResult {
  Category { category: Category },
  Asset(Located),
}

/// `POST /scan`, body: `{"input":"A001"}`
pub async fn handler<S: AssetStore>(
  State(state): State<AppState<S>>,
  Json(body): Json<ScanBody>,
) -> Result<Json<ScanResult>, ApiError> {
  if let Some(category) = state.engine.aliases().canonicalize(&body.input) {
    return Ok(Json(ScanResult::Category { category }));
  }
  let tag = AssetTag::new(&body.input)?;
  let located = state.engine.resolver().locate(&tag).await?;
  Ok(Json(ScanResult::Asset(located)))
}
