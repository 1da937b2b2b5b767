//! The ordered list of stores known at startup.
//!
//! Order is priority: it breaks ties when a tag is found in more than one
//! store, orders fan-out results, and orders equal-time activity entries.

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::{Error, Result, category::Category};

/// One named store and the category it holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSpec {
  pub category: Category,
  /// Collection name in the backing store.
  pub name:     String,
}

/// Every category mapped to exactly one named store, in priority order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreLayout {
  stores: Vec<StoreSpec>,
}

impl StoreLayout {
  /// Validate a caller-supplied layout: every category exactly once and no
  /// two categories sharing a store name.
  pub fn new(stores: Vec<StoreSpec>) -> Result<Self> {
    for category in Category::iter() {
      match stores.iter().filter(|s| s.category == category).count() {
        0 => {
          return Err(Error::Layout(format!("no store configured for {category}")));
        }
        1 => {}
        _ => {
          return Err(Error::Layout(format!(
            "more than one store configured for {category}"
          )));
        }
      }
    }
    for (i, spec) in stores.iter().enumerate() {
      if spec.name.trim().is_empty() {
        return Err(Error::Layout(format!(
          "store name for {} is empty",
          spec.category
        )));
      }
      if stores[..i].iter().any(|s| s.name == spec.name) {
        return Err(Error::Layout(format!(
          "store name {:?} is used twice",
          spec.name
        )));
      }
    }
    Ok(Self { stores })
  }

  /// Stores in priority order.
  pub fn stores(&self) -> &[StoreSpec] { &self.stores }

  pub fn categories(&self) -> impl Iterator<Item = Category> + '_ {
    self.stores.iter().map(|s| s.category)
  }

  /// Position of `category` in the priority list (0 is highest).
  pub fn priority(&self, category: Category) -> usize {
    self
      .stores
      .iter()
      .position(|s| s.category == category)
      .unwrap_or(usize::MAX)
  }

  pub fn name_of(&self, category: Category) -> &str {
    self
      .stores
      .iter()
      .find(|s| s.category == category)
      .map(|s| s.name.as_str())
      .unwrap_or_default()
  }

  pub fn len(&self) -> usize { self.stores.len() }

  pub fn is_empty(&self) -> bool { self.stores.is_empty() }
}

impl Default for StoreLayout {
  /// The collection names used by the original deployment.
  fn default() -> Self {
    let stores = Category::iter()
      .map(|category| StoreSpec {
        category,
        name: match category {
          Category::Computer => "Computer",
          Category::Monitor => "Monitor",
          Category::Server => "Server",
          Category::Switch => "Switches",
          Category::Tablet => "iPads",
          Category::Quarantine => "Quarantine",
        }
        .to_owned(),
      })
      .collect();
    Self { stores }
  }
}
