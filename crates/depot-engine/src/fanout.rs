//! The store set and the fan-out join over it.
//!
//! [`StoreSet::fan_out`] runs one operation per store concurrently and
//! completes once every store has answered. A failing store never stalls the
//! others; it contributes an error marker to the [`Joined`] result instead.

use std::future::Future;

use depot_core::{
  Error, Result,
  category::Category,
  layout::{StoreLayout, StoreSpec},
  store::AssetStore,
};
use futures::future::join_all;

// ─── StoreSet ────────────────────────────────────────────────────────────────

/// One store per category, held in priority order.
pub struct StoreSet<S> {
  layout: StoreLayout,
  stores: Vec<(Category, S)>,
}

impl<S: AssetStore> StoreSet<S> {
  /// Build a set by opening one store for each entry in `layout`.
  pub fn new(layout: StoreLayout, mut open: impl FnMut(&StoreSpec) -> S) -> Self {
    let stores = layout.stores().iter().map(|spec| (spec.category, open(spec))).collect();
    Self { layout, stores }
  }

  pub fn layout(&self) -> &StoreLayout { &self.layout }

  /// The store holding `category`.
  pub fn store(&self, category: Category) -> Result<&S> {
    self
      .stores
      .iter()
      .find(|(c, _)| *c == category)
      .map(|(_, s)| s)
      .ok_or_else(|| Error::Layout(format!("no store configured for {category}")))
  }

  /// Stores in priority order.
  pub fn iter(&self) -> impl Iterator<Item = (Category, &S)> {
    self.stores.iter().map(|(c, s)| (*c, s))
  }

  /// Run `op` against every store at once and wait for all of them.
  ///
  /// The result is ordered by store priority, not by completion order.
  pub async fn fan_out<'a, T, F, Fut>(&'a self, op: F) -> Joined<T>
  where
    F: Fn(Category, &'a S) -> Fut,
    Fut: Future<Output = Result<T, S::Error>>,
  {
    let pending = self.stores.iter().map(|(category, store)| {
      let category = *category;
      let fut = op(category, store);
      async move {
        let result = fut.await.map_err(|e| Error::backend(category, e));
        StoreOutcome { category, result }
      }
    });

    let entries = join_all(pending).await;
    for entry in &entries {
      if let Err(e) = &entry.result {
        tracing::warn!(store = %entry.category, error = %e, "store operation failed");
      }
    }
    Joined { entries }
  }
}

// ─── Joined ──────────────────────────────────────────────────────────────────

/// One store's contribution to a fan-out.
#[derive(Debug)]
pub struct StoreOutcome<T> {
  pub category: Category,
  pub result:   Result<T>,
}

/// The completed fan-out: one outcome per store, in priority order.
#[derive(Debug)]
pub struct Joined<T> {
  entries: Vec<StoreOutcome<T>>,
}

impl<T> Joined<T> {
  pub fn entries(&self) -> &[StoreOutcome<T>] { &self.entries }

  pub fn into_entries(self) -> Vec<StoreOutcome<T>> { self.entries }

  pub fn successes(&self) -> impl Iterator<Item = (Category, &T)> {
    self
      .entries
      .iter()
      .filter_map(|e| e.result.as_ref().ok().map(|v| (e.category, v)))
  }

  pub fn failures(&self) -> impl Iterator<Item = (Category, &Error)> {
    self
      .entries
      .iter()
      .filter_map(|e| e.result.as_ref().err().map(|err| (e.category, err)))
  }

  /// The highest-priority failure, if any store failed.
  pub fn first_failure(&self) -> Option<(Category, &Error)> { self.failures().next() }

  /// `true` when every store answered successfully.
  pub fn is_complete(&self) -> bool { self.first_failure().is_none() }

  /// All values in priority order, or the first failure in priority order.
  pub fn into_result(self) -> Result<Vec<(Category, T)>> {
    self
      .entries
      .into_iter()
      .map(|e| e.result.map(|v| (e.category, v)))
      .collect()
  }
}
