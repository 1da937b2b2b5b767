//! Finding the store that currently holds a tag.
//!
//! There is no global index: every lookup asks every store at once through
//! the fan-out join and picks the answer by store priority.

use std::sync::Arc;

use depot_core::{
  ConsistencyWarning, Error, Result,
  asset::{AssetRecord, AssetTag, Document},
  category::Category,
  store::AssetStore,
};
use serde::Serialize;

use crate::fanout::StoreSet;

/// Where a tag was found, and what is stored there.
#[derive(Debug, Clone, Serialize)]
pub struct Located {
  pub tag:      AssetTag,
  pub category: Category,
  pub record:   AssetRecord,
  /// Set when the tag was also found in lower-priority stores.
  pub warning:  Option<ConsistencyWarning>,
}

/// The full per-store answer for one tag.
#[derive(Debug)]
pub struct Resolution {
  pub tag:      AssetTag,
  /// Every store holding the tag, in priority order.
  pub hits:     Vec<(Category, Document)>,
  /// Every store that could not answer.
  pub failures: Vec<(Category, Error)>,
}

impl Resolution {
  pub fn holds(&self, category: Category) -> bool {
    self.hits.iter().any(|(c, _)| *c == category)
  }

  pub fn failed(&self, category: Category) -> bool {
    self.failures.iter().any(|(c, _)| *c == category)
  }

  /// Stores holding the tag, in priority order.
  pub fn stores(&self) -> Vec<Category> {
    self.hits.iter().map(|(c, _)| *c).collect()
  }

  /// Collapse into a single answer: the first hit in priority order.
  ///
  /// With no hits, an unreachable store might still hold the tag, so a
  /// failure is reported instead of `NotFound`.
  pub fn into_located(mut self) -> Result<Located> {
    let warning = (self.hits.len() > 1).then(|| ConsistencyWarning {
      tag:    self.tag.clone(),
      stores: self.stores(),
    });

    if self.hits.is_empty() {
      return match self.failures.drain(..).next() {
        Some((_, err)) => Err(err),
        None => Err(Error::NotFound(self.tag)),
      };
    }

    let (category, document) = self.hits.swap_remove(0);
    Ok(Located {
      record: AssetRecord::from_document(category, document),
      tag: self.tag,
      category,
      warning,
    })
  }
}

/// Resolves tags against every store in a [`StoreSet`].
pub struct AssetResolver<S> {
  stores: Arc<StoreSet<S>>,
}

impl<S> Clone for AssetResolver<S> {
  fn clone(&self) -> Self { Self { stores: self.stores.clone() } }
}

impl<S: AssetStore> AssetResolver<S> {
  pub fn new(stores: Arc<StoreSet<S>>) -> Self { Self { stores } }

  /// Ask every store for `tag` and report every answer.
  pub async fn resolve_all(&self, tag: &AssetTag) -> Resolution {
    let joined = self.stores.fan_out(|_, store| store.get(tag)).await;

    let mut hits = Vec::new();
    let mut failures = Vec::new();
    for entry in joined.into_entries() {
      match entry.result {
        Ok(Some(doc)) => hits.push((entry.category, doc)),
        Ok(None) => {}
        Err(e) => failures.push((entry.category, e)),
      }
    }
    Resolution { tag: tag.clone(), hits, failures }
  }

  /// The single store that holds `tag`.
  ///
  /// If more than one store holds it, the highest-priority store wins and
  /// the result carries a [`ConsistencyWarning`].
  pub async fn locate(&self, tag: &AssetTag) -> Result<Located> {
    let resolution = self.resolve_all(tag).await;
    if !resolution.failures.is_empty() && !resolution.hits.is_empty() {
      tracing::warn!(
        tag = %tag,
        unreachable = resolution.failures.len(),
        "resolved with some stores unreachable"
      );
    }

    let located = resolution.into_located()?;
    if let Some(warning) = &located.warning {
      tracing::warn!(tag = %tag, chosen = %located.category, "{warning}");
    }
    Ok(located)
  }
}
