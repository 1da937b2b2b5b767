//! Handlers for `/assets` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/assets/{tag}` | 404 if no store holds the tag |
//! | `POST` | `/assets/{tag}/transition` | Body: `{"category":"pc","location":"DepartmentIT","owner":"alice"}` |
//! | `POST` | `/assets/{tag}/move` | Body: `{"category":"quarantine"}` |
//!
//! `category` accepts any alias known to the server as well as the canonical
//! category names.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use depot_core::{
  asset::{AssetTag, Attributes},
  store::AssetStore,
};
use depot_engine::{Located, TransitionKind, TransitionReport};
use serde::Deserialize;

use crate::{AppState, error::ApiError};

// ─── Locate ──────────────────────────────────────────────────────────────────

/// `GET /assets/{tag}`
pub async fn locate<S: AssetStore>(
  State(state): State<AppState<S>>,
  Path(tag): Path<String>,
) -> Result<Json<Located>, ApiError> {
  let tag = AssetTag::new(tag)?;
  let located = state.engine.resolver().locate(&tag).await?;
  Ok(Json(located))
}

// ─── Transition ──────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TransitionBody {
  pub category:   String,
  pub location:   String,
  #[serde(flatten)]
  pub attributes: Attributes,
}

/// `POST /assets/{tag}/transition`
///
/// Responds `201 Created` when the tag was registered, `200 OK` otherwise.
pub async fn transition<S: AssetStore>(
  State(state): State<AppState<S>>,
  Path(tag): Path<String>,
  Json(body): Json<TransitionBody>,
) -> Result<impl IntoResponse, ApiError> {
  let category = state.engine.classify_category(&body.category)?;
  let report = state
    .engine
    .register_or_transition(&tag, category, &body.location, &body.attributes)
    .await?;
  let status = match report.kind {
    TransitionKind::Registered => StatusCode::CREATED,
    _ => StatusCode::OK,
  };
  Ok((status, Json(report)))
}

// ─── Move ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MoveBody {
  pub category: String,
}

/// `POST /assets/{tag}/move`
pub async fn move_to<S: AssetStore>(
  State(state): State<AppState<S>>,
  Path(tag): Path<String>,
  Json(body): Json<MoveBody>,
) -> Result<Json<TransitionReport>, ApiError> {
  let category = state.engine.classify_category(&body.category)?;
  let report = state.engine.move_to(&tag, category).await?;
  Ok(Json(report))
}
