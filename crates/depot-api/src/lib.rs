//! JSON REST API for Depot.
//!
//! Exposes an axum [`Router`] over the transition engine, the aggregation
//! cache, and the reconciler. TLS, auth, and request tracing are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", depot_api::api_router(state))
//! ```

pub mod activity;
pub mod assets;
pub mod error;
pub mod scan;
pub mod stores;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use depot_core::store::AssetStore;
use depot_engine::{AggregationCache, Reconciler, TransitionEngine};

pub use error::ApiError;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S> {
  pub engine:     Arc<TransitionEngine<S>>,
  pub cache:      AggregationCache,
  pub reconciler: Reconciler<S>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      engine:     self.engine.clone(),
      cache:      self.cache.clone(),
      reconciler: self.reconciler.clone(),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: AssetStore + 'static,
{
  Router::new()
    // Aggregates
    .route("/summary", get(activity::summary::<S>))
    .route("/activity", get(activity::recent::<S>))
    // Assets
    .route("/assets/{tag}", get(assets::locate::<S>))
    .route("/assets/{tag}/transition", post(assets::transition::<S>))
    .route("/assets/{tag}/move", post(assets::move_to::<S>))
    .route("/scan", post(scan::handler::<S>))
    // Stores
    .route("/stores/{category}/assets", get(stores::list_assets::<S>))
    .route("/consistency", get(stores::consistency::<S>))
    .with_state(state)
}

#[cfg(test)]
mod tests;
