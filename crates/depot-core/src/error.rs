//! Error types for `depot-core`.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{asset::AssetTag, category::Category};

/// A store-specific error, boxed so it can cross crate boundaries.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("asset {0} was not found in any store")]
  NotFound(AssetTag),

  #[error("validation failed: {0}")]
  ValidationFailed(String),

  #[error("the {store} store is unavailable: {source}")]
  BackendUnavailable {
    store:  Category,
    #[source]
    source: BoxError,
  },

  /// The copy half of a move succeeded but the delete did not; the tag is
  /// held by both stores until reconciled.
  #[error(
    "asset {tag} was copied to the {to} store but could not be removed from \
     the {from} store; it is now in both until reconciled: {source}"
  )]
  PartialMove {
    tag:    AssetTag,
    from:   Category,
    to:     Category,
    #[source]
    source: BoxError,
  },

  #[error("invalid store layout: {0}")]
  Layout(String),

  #[error("alias {alias:?} is claimed by both {first} and {second}")]
  AliasConflict {
    alias:  String,
    first:  Category,
    second: Category,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn backend(store: Category, source: impl Into<BoxError>) -> Self {
    Self::BackendUnavailable { store, source: source.into() }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ─── ConsistencyWarning ──────────────────────────────────────────────────────

/// A tag was observed in more than one store at once. Not an error for the
/// caller: the first store in priority order wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsistencyWarning {
  pub tag:    AssetTag,
  /// Every store holding the tag, in priority order.
  pub stores: Vec<Category>,
}

impl fmt::Display for ConsistencyWarning {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "asset {} is present in {} stores: ", self.tag, self.stores.len())?;
    for (i, store) in self.stores.iter().enumerate() {
      if i > 0 {
        f.write_str(", ")?;
      }
      write!(f, "{store}")?;
    }
    Ok(())
  }
}
