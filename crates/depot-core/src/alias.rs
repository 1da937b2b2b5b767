//! Free-text aliases for device categories.
//!
//! Scanned labels and hand-typed item types rarely match a category name
//! exactly ("iPad", "laptop", "network switch"). The [`AliasTable`] maps such
//! text onto a [`Category`]. It is built once and never mutated; callers
//! receive it by value or behind an `Arc`.

use std::collections::{BTreeMap, HashMap};

use strum::IntoEnumIterator;

use crate::{Error, Result, category::Category};

/// An immutable, case-insensitive alias → category lookup.
#[derive(Debug, Clone)]
pub struct AliasTable {
  by_alias:    HashMap<String, Category>,
  by_category: BTreeMap<Category, Vec<String>>,
}

impl AliasTable {
  /// Build a table from `(category, aliases)` pairs.
  ///
  /// Aliases are compared in lowercase with surrounding whitespace removed.
  /// An alias listed under two different categories is rejected.
  pub fn new<I, A, S>(entries: I) -> Result<Self>
  where
    I: IntoIterator<Item = (Category, A)>,
    A: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let mut by_alias = HashMap::new();
    let mut by_category: BTreeMap<Category, Vec<String>> = BTreeMap::new();

    for (category, aliases) in entries {
      for alias in aliases {
        let key = normalise(alias.as_ref());
        if key.is_empty() {
          continue;
        }
        match by_alias.get(&key) {
          Some(&existing) if existing != category => {
            return Err(Error::AliasConflict {
              alias:  key,
              first:  existing,
              second: category,
            });
          }
          Some(_) => continue,
          None => {}
        }
        by_alias.insert(key.clone(), category);
        by_category.entry(category).or_default().push(key);
      }
    }

    Ok(Self { by_alias, by_category })
  }

  /// An empty table; every lookup misses.
  pub fn empty() -> Self {
    Self { by_alias: HashMap::new(), by_category: BTreeMap::new() }
  }

  /// Map `raw` onto a category, if it is a known alias.
  pub fn canonicalize(&self, raw: &str) -> Option<Category> {
    self.by_alias.get(&normalise(raw)).copied()
  }

  /// The aliases registered for `category`, normalised.
  pub fn aliases_for(&self, category: Category) -> &[String] {
    self
      .by_category
      .get(&category)
      .map(Vec::as_slice)
      .unwrap_or_default()
  }

  pub fn len(&self) -> usize { self.by_alias.len() }

  pub fn is_empty(&self) -> bool { self.by_alias.is_empty() }
}

/// The aliases every deployment starts with.
fn builtin_aliases(category: Category) -> &'static [&'static str] {
  match category {
    Category::Computer => &["pc", "desktop", "laptop", "notebook", "workstation"],
    Category::Monitor => &["display", "screen", "lcd"],
    Category::Server => &["rack server", "blade", "host"],
    Category::Switch => &["switches", "network switch"],
    Category::Tablet => &["ipad", "ipads", "tablet pc"],
    Category::Quarantine => &["gary", "stale", "quarantined"],
  }
}

impl Default for AliasTable {
  /// The built-in table. The built-in lists must stay disjoint.
  fn default() -> Self {
    Self::new(Category::iter().map(|c| (c, builtin_aliases(c))))
      .unwrap_or_else(|_| Self::empty())
  }
}

fn normalise(raw: &str) -> String { raw.trim().to_lowercase() }
