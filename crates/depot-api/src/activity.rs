//! Handlers for the cached aggregates.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/summary` | Per-store counts and the overall total |
//! | `GET`  | `/activity` | `?limit=<n>` and `?filter=<substring>` |
//!
//! Both read the last published snapshot and never touch a store.

use axum::{
  Json,
  extract::{Query, State},
};
use depot_core::{asset::ActivityEntry, store::AssetStore};
use depot_engine::aggregate::StoreCount;
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Entries returned by `/activity` when no limit is given.
pub const DEFAULT_ACTIVITY_LIMIT: usize = 5;

// ─── Summary ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
  pub version:                 u64,
  /// `false` until every store has reported at least once.
  pub loaded:                  bool,
  pub stores:                  Vec<StoreCount>,
  pub total_across_all_stores: usize,
}

/// `GET /summary`
pub async fn summary<S: AssetStore>(State(state): State<AppState<S>>) -> Json<Summary> {
  let snapshot = state.cache.snapshot();
  Json(Summary {
    version:                 snapshot.version,
    loaded:                  snapshot.is_loaded(),
    total_across_all_stores: snapshot.total_across_all_stores(),
    stores:                  snapshot.counts.clone(),
  })
}

// ─── Activity ────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ActivityParams {
  pub limit:  Option<usize>,
  /// Case-insensitive substring of the asset tag.
  pub filter: Option<String>,
}

/// `GET /activity[?limit=<n>][&filter=<substring>]`
///
/// Without a filter, the `limit` most recent entries. With a filter, every
/// matching entry, truncated to `limit` if one is given.
pub async fn recent<S: AssetStore>(
  State(state): State<AppState<S>>,
  Query(params): Query<ActivityParams>,
) -> Json<Vec<ActivityEntry>> {
  let snapshot = state.cache.snapshot();
  let entries = match params.filter.as_deref() {
    Some(needle) => {
      let limit = params.limit.unwrap_or(usize::MAX);
      snapshot.filtered_by(needle).into_iter().take(limit).cloned().collect()
    }
    None => snapshot
      .top_n_activity(params.limit.unwrap_or(DEFAULT_ACTIVITY_LIMIT))
      .to_vec(),
  };
  Json(entries)
}
