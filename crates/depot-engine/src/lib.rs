//! The asset lifecycle and aggregation engine.
//!
//! Everything here is generic over [`depot_core::store::AssetStore`]; one
//! store instance per category is held in a [`StoreSet`].
//!
//! ```text
//! scan ─▶ AliasTable ─▶ AssetResolver ─▶ TransitionEngine ─▶ store writes
//!                                                               │
//!              AggregationCache ◀── per-store subscriptions ◀───┘
//! ```

pub mod aggregate;
pub mod fanout;
pub mod lifecycle;
pub mod reconcile;
pub mod resolver;

pub use aggregate::{AggregateSnapshot, AggregationCache, CacheOptions};
pub use fanout::{Joined, StoreOutcome, StoreSet};
pub use lifecycle::{LocationPolicy, TransitionEngine, TransitionKind, TransitionReport};
pub use reconcile::{ReconcileOptions, ReconcileOutcome, ReconcileRequest, Reconciler};
pub use resolver::{AssetResolver, Located, Resolution};
